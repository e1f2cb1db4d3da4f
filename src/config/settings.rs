use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cps::CertificateMaterial;
use crate::error::Error;
use crate::types::{KeyAlgorithm, Result};
use crate::workflow::{UploadOptions, VerificationOptions, WaitContext, DEFAULT_POLL_INTERVAL};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// General configuration
    #[serde(default)]
    pub general: GeneralConfig,

    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// CPS client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Change polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Verification workflow configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Upload workflow configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// What the binary runs
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable structured logging
    pub structured_logging: bool,
}

/// CPS client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Client type (http, mock)
    pub client_type: String,

    /// API base URL, e.g. `https://akab-xxxx.luna.akamaiapis.net`
    pub base_url: String,

    /// Bearer token sent with every request
    pub access_token: Option<String>,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_type: "http".to_string(),
            base_url: String::new(),
            access_token: None,
            request_timeout_secs: 30,
        }
    }
}

/// Change polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between change status fetches (seconds)
    pub interval_secs: u64,

    /// Overall limit on one workflow invocation (seconds)
    pub timeout_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Acknowledge any pre-verification warnings
    pub acknowledge_pre_verification_warnings: bool,

    /// Warning codes acknowledged automatically
    pub auto_approve_warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Acknowledge any post-verification warnings
    pub acknowledge_post_verification_warnings: bool,

    /// Warning codes acknowledged automatically
    pub auto_approve_warnings: Vec<String>,

    /// Sign off change management
    pub acknowledge_change_management: bool,

    /// Wait for deployment after upload
    pub wait_for_deployment: bool,

    /// RSA certificate files
    #[serde(default)]
    pub rsa: CertificateFiles,

    /// ECDSA certificate files
    #[serde(default)]
    pub ecdsa: CertificateFiles,
}

/// PEM files for one key algorithm
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateFiles {
    pub certificate_path: Option<PathBuf>,
    pub trust_chain_path: Option<PathBuf>,
}

impl CertificateFiles {
    fn is_empty(&self) -> bool {
        self.certificate_path.is_none() && self.trust_chain_path.is_none()
    }

    fn load(&self, key_algorithm: KeyAlgorithm) -> Result<CertificateMaterial> {
        let certificate = match &self.certificate_path {
            Some(path) => read_pem(path)?,
            None => String::new(),
        };
        let trust_chain = match &self.trust_chain_path {
            Some(path) => Some(read_pem(path)?),
            None => None,
        };
        Ok(CertificateMaterial::new(key_algorithm, certificate, trust_chain))
    }
}

fn read_pem(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::Config(format!("could not read {}: {}", path.display(), e)))
}

/// Workflow run by the binary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowAction {
    /// Drive the pending change to its next milestone
    #[default]
    Verify,
    /// Upload third-party certificates
    Upload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Workflow to run
    pub action: WorkflowAction,

    /// Target enrollment
    pub enrollment_id: Option<i64>,
}

impl Settings {
    /// Load configuration from environment variables and configuration files
    pub fn load() -> Result<Self> {
        use config::{Config, Environment, File};
        use std::env;

        let mut builder = Config::builder();

        // Add default values
        builder = builder.add_source(Config::try_from(&Self::default())?);

        // Add configuration from files
        if let Ok(config_path) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_path));
        } else {
            builder = builder.add_source(File::with_name("config/default").required(false));

            let env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
            builder = builder.add_source(File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add environment variables
        builder = builder.add_source(Environment::with_prefix("CPS").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a single file on top of the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use config::{Config, File};

        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check if configuration is valid
    pub fn validate(&self) -> Result<()> {
        if self.client.client_type == "http" && self.client.base_url.trim().is_empty() {
            return Err(Error::Config("CPS base URL cannot be empty".into()));
        }

        if self.polling.interval_secs == 0 {
            return Err(Error::Config("Poll interval must be at least one second".into()));
        }

        for (algorithm, files) in [(KeyAlgorithm::Rsa, &self.upload.rsa), (KeyAlgorithm::Ecdsa, &self.upload.ecdsa)] {
            if files.trust_chain_path.is_some() && files.certificate_path.is_none() {
                return Err(Error::Config(format!(
                    "{} trust chain path is set without a certificate path",
                    algorithm
                )));
            }
        }

        Ok(())
    }

    /// Delay between change status fetches
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    /// Wait context bounded by the configured timeout
    pub fn wait_context(&self, ctx: WaitContext) -> WaitContext {
        match self.polling.timeout_secs {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx,
        }
    }

    pub fn verification_options(&self) -> VerificationOptions {
        VerificationOptions {
            acknowledge_warnings: self.verification.acknowledge_pre_verification_warnings,
            auto_approve_warnings: self.verification.auto_approve_warnings.clone(),
        }
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            acknowledge_change_management: self.upload.acknowledge_change_management,
            wait_for_deployment: self.upload.wait_for_deployment,
            acknowledge_post_verification_warnings: self.upload.acknowledge_post_verification_warnings,
            auto_approve_warnings: self.upload.auto_approve_warnings.clone(),
        }
    }

    /// Read the configured certificate files, skipping algorithms with none
    pub fn certificate_materials(&self) -> Result<Vec<CertificateMaterial>> {
        [(KeyAlgorithm::Rsa, &self.upload.rsa), (KeyAlgorithm::Ecdsa, &self.upload.ecdsa)]
            .into_iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(algorithm, files)| files.load(algorithm))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    fn valid() -> Settings {
        let mut settings = Settings::default();
        settings.client.base_url = "https://cps.example.com".into();
        settings
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.general.log_level, "info");
        assert_eq!(settings.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(settings.polling.timeout_secs, None);
        assert_eq!(settings.workflow.action, WorkflowAction::Verify);
        assert!(!settings.upload.wait_for_deployment);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        // Empty base URL
        assert!(Settings::default().validate().is_err());

        // The mock client needs no endpoint
        let mut settings = Settings::default();
        settings.client.client_type = "mock".into();
        assert!(settings.validate().is_ok());

        let mut settings = valid();
        settings.polling.interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = valid();
        settings.upload.ecdsa.trust_chain_path = Some("chain.pem".into());
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("ECDSA"));
    }

    #[test]
    fn test_from_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[client]
base_url = "https://cps.example.com"
access_token = "secret"

[polling]
interval_secs = 2
timeout_secs = 600

[verification]
auto_approve_warnings = ["TRUST_CHAIN_NULL_OR_EMPTY"]

[upload]
acknowledge_change_management = true
wait_for_deployment = true

[workflow]
action = "upload"
enrollment_id = 1234
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.client.access_token.as_deref(), Some("secret"));
        assert_eq!(settings.client.request_timeout_secs, 30);
        assert_eq!(settings.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.workflow.action, WorkflowAction::Upload);
        assert_eq!(settings.workflow.enrollment_id, Some(1234));
        assert_eq!(
            settings.verification_options().auto_approve_warnings,
            vec!["TRUST_CHAIN_NULL_OR_EMPTY"]
        );

        let options = settings.upload_options();
        assert!(options.acknowledge_change_management);
        assert!(options.wait_for_deployment);
        assert!(!options.acknowledge_post_verification_warnings);
    }

    #[test]
    fn test_certificate_materials() {
        let dir = tempdir().unwrap();
        let cert = dir.path().join("rsa.pem");
        let chain = dir.path().join("rsa-chain.pem");
        fs::write(&cert, "-----BEGIN CERTIFICATE-----\nrsa\n").unwrap();
        fs::write(&chain, "-----BEGIN CERTIFICATE-----\nchain\n").unwrap();

        let mut settings = valid();
        settings.upload.rsa = CertificateFiles {
            certificate_path: Some(cert),
            trust_chain_path: Some(chain),
        };

        let materials = settings.certificate_materials().unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].key_algorithm, KeyAlgorithm::Rsa);
        assert!(materials[0].has_certificate());
        assert!(materials[0].has_trust_chain());

        settings.upload.ecdsa.certificate_path = Some(dir.path().join("missing.pem"));
        assert!(matches!(settings.certificate_materials(), Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_context_timeout() {
        let mut settings = valid();
        assert!(settings.wait_context(WaitContext::new()).deadline().is_none());

        settings.polling.timeout_secs = Some(60);
        let ctx = settings.wait_context(WaitContext::new());
        assert_eq!(
            ctx.deadline(),
            Some(tokio::time::Instant::now() + Duration::from_secs(60))
        );
    }
}
