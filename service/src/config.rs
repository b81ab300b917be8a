use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default Feishu open-platform base URL used when `FEISHU_BASE_URL` is not set.
pub const DEFAULT_FEISHU_BASE_URL: &str = "https://open.feishu.cn";

/// Default DingTalk OAuth2/contact API base URL.
pub const DEFAULT_DINGTALK_API_BASE_URL: &str = "https://api.dingtalk.com";

/// Default DingTalk legacy API base URL (service token, union-id lookup).
pub const DEFAULT_DINGTALK_OAPI_BASE_URL: &str = "https://oapi.dingtalk.com";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The secret used to sign and verify session tokens.
    #[arg(long, env, default_value = "default-jwt-secret-change-in-production")]
    jwt_secret: String,

    /// The Feishu application ID (OAuth client id).
    #[arg(long, env)]
    feishu_app_id: Option<String>,

    /// The Feishu application secret (OAuth client secret).
    #[arg(long, env)]
    feishu_app_secret: Option<String>,

    /// The redirect URI registered with Feishu for the login callback.
    #[arg(long, env)]
    feishu_redirect_uri: Option<String>,

    /// The base URL of the Feishu open-platform API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_FEISHU_BASE_URL)]
    feishu_base_url: String,

    /// The DingTalk application key (OAuth client id).
    #[arg(long, env)]
    dingtalk_app_key: Option<String>,

    /// The DingTalk application secret (OAuth client secret).
    #[arg(long, env)]
    dingtalk_app_secret: Option<String>,

    /// The redirect URI registered with DingTalk for the login callback.
    #[arg(long, env)]
    dingtalk_redirect_uri: Option<String>,

    /// The corporate tenant id embedded in the DingTalk consent URL.
    #[arg(long, env)]
    dingtalk_corp_id: Option<String>,

    /// The base URL of the DingTalk OAuth2/contact API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_DINGTALK_API_BASE_URL)]
    dingtalk_api_base_url: String,

    /// The base URL of the DingTalk legacy API (service token, union-id lookup).
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_DINGTALK_OAPI_BASE_URL)]
    dingtalk_oapi_base_url: String,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the session token signing secret.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn set_jwt_secret(mut self, jwt_secret: String) -> Self {
        self.jwt_secret = jwt_secret;
        self
    }

    pub fn feishu_app_id(&self) -> Option<String> {
        self.feishu_app_id.clone()
    }

    pub fn feishu_app_secret(&self) -> Option<String> {
        self.feishu_app_secret.clone()
    }

    pub fn feishu_redirect_uri(&self) -> Option<String> {
        self.feishu_redirect_uri.clone()
    }

    /// Returns the Feishu open-platform API base URL.
    pub fn feishu_base_url(&self) -> &str {
        &self.feishu_base_url
    }

    pub fn dingtalk_app_key(&self) -> Option<String> {
        self.dingtalk_app_key.clone()
    }

    pub fn dingtalk_app_secret(&self) -> Option<String> {
        self.dingtalk_app_secret.clone()
    }

    pub fn dingtalk_redirect_uri(&self) -> Option<String> {
        self.dingtalk_redirect_uri.clone()
    }

    pub fn dingtalk_corp_id(&self) -> Option<String> {
        self.dingtalk_corp_id.clone()
    }

    /// Returns the DingTalk OAuth2/contact API base URL.
    pub fn dingtalk_api_base_url(&self) -> &str {
        &self.dingtalk_api_base_url
    }

    /// Returns the DingTalk legacy API base URL.
    pub fn dingtalk_oapi_base_url(&self) -> &str {
        &self.dingtalk_oapi_base_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        // This could check an environment variable, or a config field
        self.runtime_env() == RustEnv::Production
    }
}
