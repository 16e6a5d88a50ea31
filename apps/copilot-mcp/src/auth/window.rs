//! Host window lookup.
//!
//! On Windows a console process can hand its console window to the login so
//! the sign-in UI is parented to it. Other platforms have nothing to attach.

/// Opaque native window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub isize);

pub trait HostWindow: Send + Sync {
    fn try_get_host_window_handle(&self) -> Option<WindowHandle>;
}

/// Platforms without a native console window.
#[cfg_attr(windows, allow(dead_code))]
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostWindow;

impl HostWindow for NoHostWindow {
    fn try_get_host_window_handle(&self) -> Option<WindowHandle> {
        None
    }
}

#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleWindow;

#[cfg(windows)]
impl HostWindow for ConsoleWindow {
    fn try_get_host_window_handle(&self) -> Option<WindowHandle> {
        #[link(name = "kernel32")]
        unsafe extern "system" {
            fn GetConsoleWindow() -> *mut core::ffi::c_void;
        }

        // SAFETY: GetConsoleWindow takes no arguments and returns NULL when
        // the process has no console.
        let handle = unsafe { GetConsoleWindow() };
        (!handle.is_null()).then(|| WindowHandle(handle as isize))
    }
}

/// The host window capability for the current platform.
pub fn platform_host_window() -> Box<dyn HostWindow> {
    #[cfg(windows)]
    {
        Box::new(ConsoleWindow)
    }
    #[cfg(not(windows))]
    {
        Box::new(NoHostWindow)
    }
}
