//! Engine binary entry point

use std::env;
use std::process;

use clap::Parser;

use engine::services::{GeminiClient, OpenAiClient, ProviderRouter};
use engine::{EngineConfig, WorksheetEngine};
use shared::{GenerationMode, GenerationRequest, PairCount};

#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "Generative rhyming worksheet engine")]
struct Args {
    /// Worksheet language
    #[arg(long, default_value = "english")]
    language: String,

    /// Number of rhyme pairs (3 to 5)
    #[arg(long, default_value_t = 4)]
    pairs: u8,

    /// Optional worksheet topic
    #[arg(long, default_value = "")]
    topic: String,

    /// Return the text draft immediately, hydrate images in the background
    #[arg(long)]
    defer_images: bool,

    /// Re-illustrate this word instead of generating a worksheet
    #[arg(long)]
    refresh_word: Option<String>,

    /// Rhyme partner for --refresh-word; allows the word itself to change
    #[arg(long)]
    paired_word: Option<String>,

    /// Produce a fresh random topic instead of generating a worksheet
    #[arg(long)]
    shuffle_topic: bool,

    /// Text model to try first
    #[arg(long)]
    text_model: Option<String>,

    /// Image model to try first
    #[arg(long)]
    image_model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    shared::logging::init_tracing(Some(&args.log_level));

    let pairs = PairCount::new(args.pairs)?;

    // Gemini keys go by two names in the wild
    let gemini_key = env::var("GEMINI_API_KEY")
        .or_else(|_| env::var("GOOGLE_API_KEY"))
        .ok();
    let openai_key = env::var("OPENAI_API_KEY").ok();
    if gemini_key.is_none() && openai_key.is_none() {
        eprintln!("Error: set GEMINI_API_KEY (or GOOGLE_API_KEY) and/or OPENAI_API_KEY");
        process::exit(1);
    }

    let http = reqwest::Client::new();
    let router = ProviderRouter::new(
        gemini_key.map(|key| GeminiClient::new(http.clone(), &key)),
        openai_key.map(|key| OpenAiClient::new(http.clone(), &key)),
    );

    let engine = WorksheetEngine::new(router.clone(), router, EngineConfig::from_env());
    let request = build_request(&args, pairs);
    let response = engine.execute(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if args.defer_images {
        if let Some(draft) = engine.await_hydration().await {
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
    }

    Ok(())
}

fn build_request(args: &Args, pairs: PairCount) -> GenerationRequest {
    if args.shuffle_topic {
        return GenerationRequest {
            mode: GenerationMode::TopicShuffle,
            ..GenerationRequest::default()
        };
    }

    if let Some(word) = &args.refresh_word {
        let mut request = GenerationRequest::word_refresh(word, args.paired_word.as_deref());
        request.language = args.language.clone();
        request.text_model = args.text_model.clone();
        request.image_model = args.image_model.clone();
        return request;
    }

    let mut request = GenerationRequest::worksheet(&args.language, pairs, &args.topic);
    if args.defer_images {
        request.mode = GenerationMode::DeferredImages;
    }
    request.text_model = args.text_model.clone();
    request.image_model = args.image_model.clone();
    request
}
