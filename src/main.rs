//! `secure-client`: command-line front end for the request-security pipeline.
//!
//! ```text
//! secure-client --config client.toml --token $TOKEN get /api/profile
//! secure-client post /api/notes --body '{"text": "<b>hi</b>"}'
//! secure-client upload /api/files ./report.pdf --field folder=reports
//! secure-client validate-file ./malware.exe
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use secure_client::config::{load_config, ClientConfig};
use secure_client::observability::logging::init_logging;
use secure_client::security::file_validation::{validate_file_upload, FileMetadata};
use secure_client::security::sanitizer::sanitize_input;
use secure_client::storage::{AuthTokens, FileStorage, MemoryStorage, SecureStorage};
use secure_client::{ApiResponse, RequestBody, RequestOptions, ResponseBody, SecureApiClient, UploadFile};

#[derive(Parser)]
#[command(name = "secure-client")]
#[command(about = "Send HTTP requests through the request-security pipeline", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured base URL.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Bearer token to use for this invocation.
    #[arg(short, long, env = "SECURE_CLIENT_TOKEN")]
    token: Option<String>,

    /// JSON file holding stored credentials.
    #[arg(long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RequestArgs {
    /// Path relative to the base URL.
    path: String,

    /// Send without a bearer token.
    #[arg(long)]
    public: bool,

    /// Do not attach a CSRF token.
    #[arg(long)]
    skip_csrf: bool,

    /// Deadline in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Extra header as `Name: value`.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a resource
    Get(RequestArgs),
    /// DELETE a resource
    Delete(RequestArgs),
    /// POST a body
    Post {
        #[command(flatten)]
        request: RequestArgs,
        #[arg(long)]
        body: Option<String>,
    },
    /// PUT a body
    Put {
        #[command(flatten)]
        request: RequestArgs,
        #[arg(long)]
        body: Option<String>,
    },
    /// PATCH a body
    Patch {
        #[command(flatten)]
        request: RequestArgs,
        #[arg(long)]
        body: Option<String>,
    },
    /// Upload a file as multipart form data
    Upload {
        #[command(flatten)]
        request: RequestArgs,
        /// File to upload.
        file: PathBuf,
        /// MIME type; guessed from the extension when omitted.
        #[arg(long)]
        mime: Option<String>,
        /// Extra form field as `key=value`.
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Check a file against the upload policy without sending it
    ValidateFile {
        file: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Print the sanitized form of a string
    Sanitize { text: String },
}

fn guess_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn options_from(args: &RequestArgs) -> Result<RequestOptions, Box<dyn std::error::Error>> {
    let mut options = RequestOptions::new().require_auth(!args.public);
    if args.skip_csrf {
        options = options.skip_csrf();
    }
    if let Some(ms) = args.timeout_ms {
        options = options.timeout_ms(ms);
    }
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header '{}' is not in `Name: value` form", raw))?;
        options = options.header(name.trim(), value.trim());
    }
    Ok(options)
}

fn body_from(body: Option<String>) -> Option<RequestBody> {
    body.map(|raw| match serde_json::from_str::<Value>(&raw) {
        Ok(value) => RequestBody::Json(value),
        Err(_) => RequestBody::Text(raw),
    })
}

fn print_response(response: ApiResponse<ResponseBody>) -> Result<(), Box<dyn std::error::Error>> {
    let data = match &response.data {
        ResponseBody::Binary(bytes) => json!({ "binary_bytes": bytes.len() }),
        other => serde_json::to_value(other)?,
    };
    let envelope = json!({
        "data": data,
        "success": response.success,
        "message": response.message,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }

    init_logging(&config.observability);
    tracing::debug!(base_url = %config.base_url, environment = ?config.environment, "Configuration loaded");

    let storage: Arc<dyn SecureStorage> = match &cli.storage {
        Some(path) => Arc::new(FileStorage::open(path)?),
        None => Arc::new(MemoryStorage::new()),
    };
    if let Some(token) = &cli.token {
        storage.set_auth_tokens(&AuthTokens {
            access_token: token.clone(),
            refresh_token: String::new(),
            expires_in: 0,
        })?;
    }

    // Offline subcommands never build a client.
    let connect = || SecureApiClient::new(config.clone(), storage.clone());

    let result = match cli.command {
        Commands::Sanitize { text } => {
            println!("{}", sanitize_input(&text));
            return Ok(());
        }
        Commands::ValidateFile { file, mime } => {
            let size = std::fs::metadata(&file)?.len();
            let meta = FileMetadata {
                name: file_name(&file),
                size,
                mime_type: mime.unwrap_or_else(|| guess_mime(&file)),
            };
            let result = validate_file_upload(&meta, &config.upload);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_valid {
                std::process::exit(1);
            }
            return Ok(());
        }
        Commands::Get(args) => connect()?.get(&args.path, options_from(&args)?).await,
        Commands::Delete(args) => connect()?.delete(&args.path, options_from(&args)?).await,
        Commands::Post { request, body } => {
            connect()?
                .post(&request.path, body_from(body), options_from(&request)?)
                .await
        }
        Commands::Put { request, body } => {
            connect()?
                .put(&request.path, body_from(body), options_from(&request)?)
                .await
        }
        Commands::Patch { request, body } => {
            connect()?
                .patch(&request.path, body_from(body), options_from(&request)?)
                .await
        }
        Commands::Upload {
            request,
            file,
            mime,
            fields,
        } => {
            let bytes = tokio::fs::read(&file).await?;
            let upload = UploadFile::new(
                file_name(&file),
                mime.unwrap_or_else(|| guess_mime(&file)),
                bytes,
            );
            let mut form = BTreeMap::new();
            for raw in &fields {
                let (k, v) = raw
                    .split_once('=')
                    .ok_or_else(|| format!("field '{}' is not in `key=value` form", raw))?;
                form.insert(k.to_string(), v.to_string());
            }
            connect()?
                .upload_file(&request.path, upload, &form, options_from(&request)?)
                .await
        }
    };

    match result {
        Ok(response) => print_response(response),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(detail) = e.detail() {
                eprintln!("Detail: {}", detail);
            }
            std::process::exit(1);
        }
    }
}
