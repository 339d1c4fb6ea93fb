use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio_util::sync::CancellationToken;

use prokit::cipher::{decrypt_by_base64, encrypt_by_base64, encrypt_by_md5, AesEncryption};
use prokit::config::{Config, StorageConfig};
use prokit::core::{ProKitError, ProKitResult, Storage};
use prokit::http::{Envelope, Http};
use prokit::logging::Logger;
use prokit::storage::{CacheOptions, FileStorage, StorageCache};

#[derive(Parser)]
#[command(name = "prokit", version, about = "HTTP, cache and cipher helpers")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a GET request
    Get {
        url: String,
        /// Query parameter, repeatable
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Send a DELETE request
    Delete {
        url: String,
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Send a POST request with a JSON object body
    Post {
        url: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Send a PUT request with a JSON object body
    Put {
        url: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Send the fields of a JSON object as multipart/form-data
    Upload {
        url: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    Md5 {
        text: String,
    },
    Base64 {
        text: String,
        #[arg(long)]
        decode: bool,
    },
    /// AES-ECB with a 16, 24 or 32 byte key
    Aes {
        #[arg(short, long)]
        key: String,
        text: String,
        #[arg(long)]
        decrypt: bool,
    },
    /// Inspect or modify the storage cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    Get {
        key: String,
    },
    Set {
        key: String,
        /// JSON value, plain text is stored as a string
        value: String,
        /// Lifetime in seconds, overrides the configured timeout
        #[arg(long)]
        expire: Option<u64>,
    },
    Remove {
        key: String,
    },
    Keys,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))
}

fn params_map(params: Vec<(String, String)>) -> Option<JsonMap<String, JsonValue>> {
    if params.is_empty() {
        return None;
    }
    Some(
        params
            .into_iter()
            .map(|(k, v)| (k, JsonValue::String(v)))
            .collect(),
    )
}

fn body_map(data: Option<String>) -> ProKitResult<Option<JsonMap<String, JsonValue>>> {
    let Some(data) = data else {
        return Ok(None);
    };
    match serde_json::from_str(&data)? {
        JsonValue::Object(map) => Ok(Some(map)),
        _ => Err(ProKitError::Validation(
            "request data must be a JSON object".to_string(),
        )),
    }
}

fn print_json(value: &impl serde::Serialize) -> ProKitResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_http(config: &Config) -> ProKitResult<Http> {
    Http::builder(config.http.clone())
        .on_show_loading(|| log::info!("loading..."))
        .on_hide_loading(|| log::info!("loading done"))
        .on_show_error(|msg, loading| {
            log::error!(mode = loading.show_error_mode.as_str(); "{msg}");
        })
        .build()
}

async fn run_http(config: &Config, command: Command) -> ProKitResult<bool> {
    let http = build_http(config)?;
    let envelope: Envelope = match command {
        Command::Get { url, params } => http.get(&url, params_map(params), None).await,
        Command::Delete { url, params } => http.delete(&url, params_map(params), None).await,
        Command::Post { url, data } => http.post(&url, body_map(data)?, None).await,
        Command::Put { url, data } => http.put(&url, body_map(data)?, None).await,
        Command::Upload { url, data } => http.upload(&url, body_map(data)?, None).await,
        _ => return Err(prokit::internal_error!("not an HTTP command")),
    };
    print_json(&envelope)?;
    Ok(envelope.is_ok())
}

fn run_cache(conf: &StorageConfig, action: CacheAction) -> ProKitResult<bool> {
    let options = CacheOptions {
        prefix_key: conf.prefix_key.clone().into(),
        timeout: conf.timeout,
    };
    match &conf.path {
        Some(path) => cache_action(StorageCache::new(FileStorage::open(path)?, options), action),
        None => {
            log::warn!("No storage path configured, cache is not persisted");
            cache_action(StorageCache::in_memory(options), action)
        }
    }
}

fn cache_action<S: Storage>(cache: StorageCache<S>, action: CacheAction) -> ProKitResult<bool> {
    match action {
        CacheAction::Get { key } => {
            let value = cache.get::<JsonValue>(&key);
            let found = value.is_some();
            print_json(&value.unwrap_or(JsonValue::Null))?;
            Ok(found)
        }
        CacheAction::Set { key, value, expire } => {
            let value = serde_json::from_str(&value).unwrap_or(JsonValue::String(value));
            match expire {
                Some(expire) => cache.set_with_expire(&key, &value, expire)?,
                None => cache.set(&key, &value)?,
            }
            Ok(true)
        }
        CacheAction::Remove { key } => {
            cache.remove(&key);
            Ok(true)
        }
        CacheAction::Keys => {
            print_json(&cache.keys())?;
            Ok(true)
        }
    }
}

async fn run(config: Config, command: Command) -> ProKitResult<bool> {
    match command {
        Command::Md5 { text } => {
            println!("{}", encrypt_by_md5(&text));
            Ok(true)
        }
        Command::Base64 { text, decode } => {
            if decode {
                println!("{}", decrypt_by_base64(&text)?);
            } else {
                println!("{}", encrypt_by_base64(&text));
            }
            Ok(true)
        }
        Command::Aes { key, text, decrypt } => {
            let aes = AesEncryption::new(&key)?;
            if decrypt {
                println!("{}", aes.decrypt_by_aes(&text)?);
            } else {
                println!("{}", aes.encrypt_by_aes(&text)?);
            }
            Ok(true)
        }
        Command::Cache { action } => run_cache(&config.storage, action),
        command => run_http(&config, command).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load_from_yaml(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    // Initialize logging
    let shutdown = CancellationToken::new();
    let log_task = match &config.log {
        Some(log) => {
            let logger = Logger::new(log.clone());
            logger.init_env_logger();
            Some(tokio::spawn(logger.run(shutdown.clone())))
        }
        None => {
            env_logger::init();
            None
        }
    };

    let result = run(config, cli.command).await;

    if let Some(task) = log_task {
        shutdown.cancel();
        match task.await {
            Ok(Err(e)) => eprintln!("Log writer failed: {e}"),
            Err(e) => eprintln!("Log writer panicked: {e}"),
            Ok(Ok(())) => {}
        }
    }

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
