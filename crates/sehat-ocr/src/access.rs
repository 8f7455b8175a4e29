//! Security-scoped file access for sandboxed desktop builds.
//!
//! A sandboxed macOS app may only read user-chosen files outside its
//! container while it holds an access grant for that URL. `ScopedAccess`
//! holds the grant for the lifetime of the guard and releases it on drop,
//! on every exit path including unwinding.

use sehat_config::OcrConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Begin/end primitive for security-scoped resources
pub trait SecurityScope: Send + Sync {
    /// Returns true when access was granted and must later be ended
    fn begin_access(&self, path: &Path) -> bool;

    fn end_access(&self, path: &Path);
}

/// Hosts without a sandbox grant model
pub struct NoSecurityScope;

impl SecurityScope for NoSecurityScope {
    fn begin_access(&self, _path: &Path) -> bool {
        false
    }

    fn end_access(&self, _path: &Path) {}
}

/// Guard holding a security-scoped grant for one request
pub struct ScopedAccess<'a> {
    scope: &'a dyn SecurityScope,
    path: &'a Path,
    granted: bool,
}

impl<'a> ScopedAccess<'a> {
    pub fn acquire(scope: &'a dyn SecurityScope, path: &'a Path) -> Self {
        let granted = scope.begin_access(path);
        debug!(path = %path.display(), granted, "security-scoped access requested");
        Self {
            scope,
            path,
            granted,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

impl Drop for ScopedAccess<'_> {
    fn drop(&mut self) {
        if self.granted {
            self.scope.end_access(self.path);
            debug!(path = %self.path.display(), "security-scoped access released");
        }
    }
}

#[cfg(target_os = "macos")]
pub use macos::MacSecurityScope;

#[cfg(target_os = "macos")]
mod macos {
    use super::SecurityScope;
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSString;
    use objc::rc::autoreleasepool;
    use objc::runtime::{BOOL, NO};
    use objc::{class, msg_send, sel, sel_impl};
    use std::path::Path;

    /// `NSURL` start/stopAccessingSecurityScopedResource
    pub struct MacSecurityScope;

    fn with_file_url<R>(path: &Path, f: impl FnOnce(id) -> R) -> R {
        autoreleasepool(|| unsafe {
            let ns_path = NSString::alloc(nil).init_str(&path.to_string_lossy());
            let url: id = msg_send![class!(NSURL), fileURLWithPath: ns_path];
            let result = f(url);
            let _: () = msg_send![ns_path, release];
            result
        })
    }

    impl SecurityScope for MacSecurityScope {
        fn begin_access(&self, path: &Path) -> bool {
            with_file_url(path, |url| unsafe {
                let granted: BOOL = msg_send![url, startAccessingSecurityScopedResource];
                granted != NO
            })
        }

        fn end_access(&self, path: &Path) {
            with_file_url(path, |url| unsafe {
                let _: () = msg_send![url, stopAccessingSecurityScopedResource];
            })
        }
    }
}

/// Pick the scope implementation for this host
pub fn default_security_scope(config: &OcrConfig) -> Arc<dyn SecurityScope> {
    if config.security_scoped_access {
        platform_scope()
    } else {
        Arc::new(NoSecurityScope)
    }
}

#[cfg(target_os = "macos")]
fn platform_scope() -> Arc<dyn SecurityScope> {
    Arc::new(MacSecurityScope)
}

#[cfg(not(target_os = "macos"))]
fn platform_scope() -> Arc<dyn SecurityScope> {
    Arc::new(NoSecurityScope)
}
