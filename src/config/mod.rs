pub mod settings;

pub use settings::{
    CertificateFiles, ClientConfig, GeneralConfig, PollingConfig, Settings, TelemetryConfig, UploadConfig,
    VerificationConfig, WorkflowAction, WorkflowConfig,
};
