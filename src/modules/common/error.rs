use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("系统后端不可用: {0}")]
    BackendUnavailable(String),

    #[error("系统后端错误: {0}")]
    Backend(String),

    #[error("注册表错误: {0}")]
    Registry(String),

    #[error("文件系统错误: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("关键系统项: {0}")]
    CriticalSystemItem(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("智能分析失败: {0}")]
    Enrichment(String),

    #[error("序列化错误: {0}")]
    Serde(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("其他错误: {0}")]
    Other(String),
}

impl CleanupError {
    /// 单个资源级别的错误：扫描器跳过该资源继续
    pub fn is_per_resource(&self) -> bool {
        matches!(
            self,
            CleanupError::NotFound(_)
                | CleanupError::PermissionDenied(_)
                | CleanupError::FileSystem(_)
        )
    }

    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, CleanupError::BackendUnavailable(_))
    }
}

impl serde::Serialize for CleanupError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_per_resource() {
        let err: CleanupError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.is_per_resource());
        assert!(!CleanupError::Backend("boom".into()).is_per_resource());
        assert!(!CleanupError::BackendUnavailable("x".into()).is_per_resource());
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_string(&CleanupError::NotFound("C:\\x".into())).unwrap();
        assert_eq!(json, "\"未找到: C:\\\\x\"");
    }
}
