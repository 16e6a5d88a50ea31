//! # Research Prompt Templates
//!
//! Eleven fixed instruction documents that steer an agent through an
//! internal-knowledge research workflow: call `Retrieve`, widen with web
//! context, then answer in a prescribed five-part shape.
//!
//! Templates are plain data in [`PROMPT_TEMPLATES`]; rendering is a pure
//! string substitution. The topic is inserted verbatim, empty or not.

// =============================================================================
// TEMPLATE TABLE
// =============================================================================

/// One research prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// MCP prompt name.
    pub name: &'static str,
    /// Search terms placed before `for <topic>` in the retrieval query.
    pub query_prefix: &'static str,
    /// The five response-shape bullets, one per line.
    pub sections: [&'static str; 5],
}

/// Identifies a template without going through its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    ProjectResearch,
    TroubleshootingGuide,
    CodeStandards,
    BusinessProcess,
    CompetitiveIntelligence,
    DevopsProcedures,
    ComplianceDocumentation,
    TrainingResources,
    CustomerInsights,
    IntegrationPatterns,
    SecurityGuidelines,
}

impl PromptKind {
    pub const ALL: [PromptKind; 11] = [
        PromptKind::ProjectResearch,
        PromptKind::TroubleshootingGuide,
        PromptKind::CodeStandards,
        PromptKind::BusinessProcess,
        PromptKind::CompetitiveIntelligence,
        PromptKind::DevopsProcedures,
        PromptKind::ComplianceDocumentation,
        PromptKind::TrainingResources,
        PromptKind::CustomerInsights,
        PromptKind::IntegrationPatterns,
        PromptKind::SecurityGuidelines,
    ];

    #[must_use]
    pub fn template(self) -> &'static PromptTemplate {
        &PROMPT_TEMPLATES[self as usize]
    }

    /// Render this template for `topic`.
    #[must_use]
    pub fn render(self, topic: &str) -> String {
        self.template().render(topic)
    }
}

/// Template table, indexed by `PromptKind as usize`.
pub static PROMPT_TEMPLATES: [PromptTemplate; 11] = [
    PromptTemplate {
        name: "project_research",
        query_prefix: "project documentation best practices guidelines standards",
        sections: [
            "🎯 Overview and relevance",
            "🏗️ Architecture & design principles",
            "📋 Development standards and best practices",
            "🔗 Key resources and documentation links",
            "✅ Actionable next steps",
        ],
    },
    PromptTemplate {
        name: "troubleshooting_guide",
        query_prefix: "troubleshooting guide solution fix error resolution",
        sections: [
            "🔍 Problem description and symptoms",
            "🎯 Quick diagnosis steps",
            "🛠️ Solution steps (primary and alternative)",
            "🔧 Prevention measures",
            "📞 Escalation path",
        ],
    },
    PromptTemplate {
        name: "code_standards",
        query_prefix: "coding standards guidelines architecture best practices conventions",
        sections: [
            "🏗️ Architecture guidelines and patterns",
            "📝 Coding conventions and style",
            "🔍 Code quality standards and review checklist",
            "🛠️ Tools and configuration",
            "📚 Examples and templates",
        ],
    },
    PromptTemplate {
        name: "business_process",
        query_prefix: "business process workflow procedure documentation",
        sections: [
            "📋 Process overview and stakeholders",
            "🔄 Process flow with clear phases",
            "👥 Roles and responsibilities",
            "📊 Success metrics and KPIs",
            "⚠️ Compliance and risk considerations",
        ],
    },
    PromptTemplate {
        name: "competitive_intelligence",
        query_prefix: "market analysis competitor intelligence business research insights",
        sections: [
            "🎯 Executive summary with key insights",
            "🏪 Market landscape and positioning",
            "🏢 Competitor analysis and threats",
            "💡 Strategic insights and opportunities",
            "📈 Key metrics and benchmarks",
        ],
    },
    PromptTemplate {
        name: "devops_procedures",
        query_prefix: "DevOps procedures deployment guide infrastructure documentation",
        sections: [
            "🎯 Procedure overview and prerequisites",
            "🚀 Step-by-step process (prep, execution, post)",
            "🛠️ Tools and resources required",
            "⚠️ Troubleshooting and common issues",
            "📞 Support and escalation contacts",
        ],
    },
    PromptTemplate {
        name: "compliance_documentation",
        query_prefix: "compliance documentation audit procedures regulatory guidelines",
        sections: [
            "📋 Compliance overview and scope",
            "📜 Regulatory requirements and standards",
            "✅ Compliance checklist and procedures",
            "📊 Audit and monitoring processes",
            "🚨 Non-compliance response plan",
        ],
    },
    PromptTemplate {
        name: "training_resources",
        query_prefix: "training resources learning materials onboarding guides",
        sections: [
            "🎯 Learning objectives and outcomes",
            "📚 Core learning materials and resources",
            "🛤️ Structured learning path by level",
            "🏆 Assessments and certification options",
            "🤝 Support and community resources",
        ],
    },
    PromptTemplate {
        name: "customer_insights",
        query_prefix: "customer insights feedback survey results user research findings",
        sections: [
            "📊 Executive summary with key findings",
            "🔍 Customer feedback analysis and metrics",
            "📈 Trends and behavioral patterns",
            "💡 Actionable insights and opportunities",
            "📋 Recommendations with timelines",
        ],
    },
    PromptTemplate {
        name: "integration_patterns",
        query_prefix: "integration patterns API documentation system integration guides",
        sections: [
            "🎯 Integration overview and business purpose",
            "🏗️ Architecture patterns and alternatives",
            "🛠️ Implementation guide with code examples",
            "🔍 Testing and monitoring strategies",
            "📋 Best practices and error handling",
        ],
    },
    PromptTemplate {
        name: "security_guidelines",
        query_prefix: "security policies guidelines controls hardening incident procedures",
        sections: [
            "🛡️ Security overview and threat model",
            "🔐 Required controls and policies",
            "🧰 Approved tools and configurations",
            "🚨 Incident response and reporting",
            "✅ Verification checklist",
        ],
    },
];

// =============================================================================
// RENDERING
// =============================================================================

impl PromptTemplate {
    /// Retrieval query embedded in the document.
    #[must_use]
    pub fn query(&self, topic: &str) -> String {
        format!("{} for {topic}", self.query_prefix)
    }

    /// Render the full research document.
    #[must_use]
    pub fn render(&self, topic: &str) -> String {
        let query = self.query(topic);
        let format: String = self.sections.iter().map(|s| format!("\n- {s}")).collect();

        format!(
            r#"You are conducting research on "{topic}". Please perform the following research steps and provide a comprehensive response:

## Step 1: Search Internal Knowledge Base
Use the Retrieve tool to search for internal documentation and resources:

```
#Retrieve: "{query}"
```

## Step 2: Gather Additional Web Context
Use the get_web_pages tool to research current best practices and industry standards related to "{topic}". Search for:
- 🔍 Recent industry articles and documentation
- 🧱 Official framework/technology documentation
- 📘 Best practice guides from reputable sources

## Step 3: Synthesize Information
Combine the internal and external research to provide a comprehensive response in this format:{format}
- 📎 Provide Sources and References
   - 🔗 **Internal Sources:** [Title](URL) - Last updated: Date
   - 🌐 **External Sources:** [Title](URL) - Accessed: Date
   - 📋 **Related Documentation:** Links to additional relevant resources
   - ⚡ **Quick Access:** Direct links to most actionable content

## Research Quality Requirements:
✔️ All claims must be backed by credible sources
✔️ Provide working links for all referenced materials
✔️ Ensure information is current and relevant
✔️ Clearly identify any gaps in available knowledge
✔️ Include specific, actionable next steps

Begin your research now by executing the #Retrieve tool with the query: "{query}""#
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
