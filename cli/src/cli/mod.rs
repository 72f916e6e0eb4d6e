use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gsignin::{
    GoogleAuthenticator, GoogleOAuthTokenGetter, IdToken, IdTokenVerifier, JsonWebToken, Method,
    ProofKeyForCodeExchange, authorization,
};
use gsignin_utils::logger::{init_logger, set_abort_with_tracing};
use serde_json::json;

use crate::config::AppConfig;
use crate::session::LoopbackSession;

#[derive(Parser)]
#[clap(name = "gsignin")]
#[clap(version = version_string())]
#[clap(subcommand_required = true, arg_required_else_help = true)]
pub struct App {
    #[clap(subcommand)]
    cmd: Cmd,
}

impl App {
    pub fn run(self) -> Result<()> {
        self.cmd.run()
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Sign in with Google and print the ID token.
    SignIn(CmdSignIn),
    /// Generate a PKCE verifier and its challenge.
    Pkce(CmdPkce),
    /// Decode a JWT without verifying it.
    Decode(CmdDecode),
    /// Print the consent page URL for a fresh PKCE pair.
    AuthorizeUrl(CmdAuthorizeUrl),
}

impl Cmd {
    fn run(self) -> Result<()> {
        match self {
            Cmd::SignIn(cmd) => cmd.run(),
            Cmd::Pkce(cmd) => cmd.run(),
            Cmd::Decode(cmd) => cmd.run(),
            Cmd::AuthorizeUrl(cmd) => cmd.run(),
        }
    }
}

#[derive(Parser)]
struct CmdSignIn {
    /// Path to the app config.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to the logger targets.
    #[clap(short, long)]
    logger_targets: Option<PathBuf>,
}

impl CmdSignIn {
    fn run(self) -> Result<()> {
        let config = load_config(self.config.as_ref())?;

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(self.run_impl(config))
    }

    async fn run_impl(self, config: AppConfig) -> Result<()> {
        init_logger(&config.logger, self.logger_targets.as_deref())?;
        set_abort_with_tracing();

        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to build http client")?;

        let session = LoopbackSession::bind(&config.loopback)
            .await
            .context("failed to bind loopback listener")?;

        let mut signin = config.signin;
        signin.redirect_uri = Some(session.redirect_uri().clone());
        signin.validate().context("invalid sign-in config")?;

        let token_getter =
            GoogleOAuthTokenGetter::with_endpoint(http_client.clone(), signin.token_endpoint.clone());

        let verifier = signin.verify_id_token.then(|| {
            Arc::new(IdTokenVerifier::new(
                http_client,
                signin.jwks_endpoint.clone(),
                vec![signin.audience.clone(), signin.client_id.clone()],
            ))
        });

        let mut builder = GoogleAuthenticator::builder(signin)
            .with_session(session)
            .with_token_getter(token_getter);
        if let Some(verifier) = verifier {
            builder = builder.with_verifier(verifier);
        }
        let authenticator = builder.build()?;

        let id_token = authenticator
            .get_oauth_token()
            .await
            .context("Google sign-in failed")?;

        print_json(&id_token)?;

        Ok(())
    }
}

#[derive(Parser)]
struct CmdPkce {
    /// Code challenge method: `S256` or `plain`.
    #[clap(short, long, default_value_t = Method::S256)]
    method: Method,
}

impl CmdPkce {
    fn run(self) -> Result<()> {
        let random = ProofKeyForCodeExchange::make_random()?;
        let pkce = ProofKeyForCodeExchange::new(random.code_verifier().as_str(), self.method)?;

        print_json(&json!({
            "code_verifier": pkce.code_verifier().as_str(),
            "code_challenge": pkce.code_challenge(),
            "code_challenge_method": pkce.method().as_str(),
        }))
    }
}

#[derive(Parser)]
struct CmdDecode {
    /// Compact JWT, e.g. an `id_token`.
    jwt: String,
}

impl CmdDecode {
    fn run(self) -> Result<()> {
        let Some(token) = JsonWebToken::parse(self.jwt.trim()) else {
            anyhow::bail!("not a valid JWT");
        };

        let id_token = IdToken::from_jwt(token.clone()).map(|id_token| {
            json!({
                "name": id_token.name,
                "email": id_token.email,
            })
        });

        print_json(&json!({
            "header": token.header(),
            "payload": token.payload(),
            "id_token": id_token,
        }))
    }
}

#[derive(Parser)]
struct CmdAuthorizeUrl {
    /// Path to the app config.
    #[clap(short, long)]
    config: Option<PathBuf>,
}

impl CmdAuthorizeUrl {
    fn run(self) -> Result<()> {
        let signin = load_config(self.config.as_ref())?.signin;
        let client_id = signin.google_client_id()?;
        let (redirect_uri, _) = signin.resolve_redirect(&client_id);

        let pkce = ProofKeyForCodeExchange::make_random()?;
        let url = authorization::authorization_url(
            &signin.authorization_endpoint,
            &client_id,
            &pkce,
            &redirect_uri,
        );

        print_json(&json!({
            "url": url.as_str(),
            "code_verifier": pkce.code_verifier().as_str(),
        }))
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let mut config: AppConfig = match path {
        Some(path) => {
            gsignin_utils::serde::load_json_from_file(path).context("failed to load app config")?
        }
        None => AppConfig::default(),
    };
    config.signin = config.signin.with_env_overrides();
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{output}");
    Ok(())
}

fn version_string() -> &'static str {
    static STRING: OnceLock<String> = OnceLock::new();
    STRING.get_or_init(|| format!("(release {GSIGNIN_VERSION}) (rustc {RUSTC_VERSION})"))
}

static GSIGNIN_VERSION: &str = env!("GSIGNIN_VERSION");
static RUSTC_VERSION: &str = env!("GSIGNIN_RUSTC_VERSION");
