use std::{collections::BTreeMap, fmt, io, sync::Arc};

use crate::fbx::FbxError;

/// Application error: a stable key, a few named arguments and the chain of causes.
#[derive(Debug, Clone)]
pub struct DemoError {
    pub key: &'static str,
    pub args: BTreeMap<&'static str, String>,
    pub causes: Vec<Arc<dyn std::error::Error + Send + Sync>>,
}

impl DemoError {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            args: BTreeMap::new(),
            causes: Vec::new(),
        }
    }

    pub fn with_arg(mut self, k: &'static str, v: impl ToString) -> Self {
        self.args.insert(k, v.to_string());
        self
    }

    pub fn push_std(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.causes.push(Arc::new(cause));
        self
    }
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.key)?;
        let mut first = true;
        for (k, v) in &self.args {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{k}={v}")?;
        }
        write!(f, ")")?;
        for cause in &self.causes {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for DemoError {
    fn from(err: io::Error) -> Self {
        DemoError::new("io-error").push_std(err)
    }
}

impl From<FbxError> for DemoError {
    fn from(err: FbxError) -> Self {
        DemoError::new("fbx-error").push_std(err)
    }
}

impl From<image::ImageError> for DemoError {
    fn from(err: image::ImageError) -> Self {
        DemoError::new("image-error").push_std(err)
    }
}

impl From<wgpu::CreateSurfaceError> for DemoError {
    fn from(err: wgpu::CreateSurfaceError) -> Self {
        DemoError::new("wgpu::CreateSurfaceError").push_std(err)
    }
}

impl From<wgpu::RequestAdapterError> for DemoError {
    fn from(err: wgpu::RequestAdapterError) -> Self {
        DemoError::new("wgpu::RequestAdapterError").push_std(err)
    }
}

impl From<wgpu::RequestDeviceError> for DemoError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        DemoError::new("wgpu::RequestDeviceError").push_std(err)
    }
}

impl From<winit::error::EventLoopError> for DemoError {
    fn from(err: winit::error::EventLoopError) -> Self {
        DemoError::new("winit::error::EventLoopError").push_std(err)
    }
}

impl From<winit::error::OsError> for DemoError {
    fn from(err: winit::error::OsError) -> Self {
        DemoError::new("winit::error::OsError").push_std(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_args_in_key_order() {
        let err = DemoError::new("scene-load")
            .with_arg("path", "a.fbx")
            .with_arg("mesh", "Body");
        assert_eq!(err.to_string(), "scene-load(mesh=Body, path=a.fbx)");
    }

    #[test]
    fn io_error_becomes_source() {
        let err: DemoError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.key, "io-error");
        assert!(std::error::Error::source(&err).is_some());
    }
}
