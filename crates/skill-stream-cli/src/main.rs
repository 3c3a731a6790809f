//! Invoke one skill and print its streamed events.

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use skill_stream::observability::init_observability;
use skill_stream::prelude::*;
use skill_stream::{CredentialProvider, EnvCredential, SkillEventKind};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Invoke a skill and stream its events")]
struct Args {
    /// Query sent to the skill
    query: String,
    /// Server origin (defaults to SKILL_STREAM_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
    /// Bearer token (defaults to SKILL_STREAM_TOKEN)
    #[arg(long)]
    token: Option<String>,
    /// Skill to invoke; the server default when omitted
    #[arg(long)]
    skill: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    locale: Option<String>,
    /// Resource id to attach to the context (repeatable)
    #[arg(long = "resource")]
    resources: Vec<String>,
    /// Document id to attach to the context (repeatable)
    #[arg(long = "document")]
    documents: Vec<String>,
    /// Print each event as a JSON line instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability();
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, ClientError> {
    let config = match &args.base_url {
        Some(base_url) => ClientConfig::new(base_url.as_str()),
        None => ClientConfig::from_env()?,
    };
    let credentials: Arc<dyn CredentialProvider> = match &args.token {
        Some(token) => Arc::new(StaticCredential::new(token.as_str())),
        None => Arc::new(EnvCredential::default()),
    };
    let client = SkillClient::builder(config)
        .credentials(credentials)
        .build()?;

    let mut stream = client.start_stream(build_request(&args)?);
    let abort = stream.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.cancel();
        }
    });

    while let Some(event) = stream.next_event().await {
        if args.json {
            print_json(&event);
        } else {
            print_text(&event);
        }
    }

    match stream.finish().await {
        Ok(summary) => {
            info!(result_id = %summary.result_id, runs = summary.runs, "invocation finished");
            Ok(ExitCode::SUCCESS)
        }
        // Already reported through the event stream.
        Err(ClientError::Invoke(InvokeError::Cancelled)) => Ok(ExitCode::from(130)),
        Err(ClientError::Invoke(_)) => Ok(ExitCode::FAILURE),
        Err(other) => Err(other),
    }
}

fn build_request(args: &Args) -> Result<InvocationRequest, ClientError> {
    let mut builder = InvocationRequest::builder(args.query.as_str());
    if let Some(skill) = &args.skill {
        builder = builder.skill(skill.as_str());
    }
    if let Some(model) = &args.model {
        builder = builder.model(model.as_str());
    }
    if let Some(locale) = &args.locale {
        builder = builder.locale(locale.as_str());
    }
    for resource in &args.resources {
        builder = builder.resource(resource.as_str());
    }
    for document in &args.documents {
        builder = builder.document(document.as_str());
    }
    builder.build()
}

fn print_text(event: &StreamEvent) {
    match event {
        StreamEvent::Started(event) => {
            let result_id = event.result_id.as_deref().unwrap_or("-");
            eprintln!("[{}] {result_id}", SkillEventKind::Started);
        }
        StreamEvent::Log(event) => {
            if let SkillPayload::Log(value) = &event.payload {
                eprintln!("[{}] {value}", SkillEventKind::Log);
            }
        }
        StreamEvent::Chunk(event) => {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(event.text().unwrap_or_default().as_bytes());
            let _ = stdout.flush();
        }
        StreamEvent::StructuredData(event) => {
            if let SkillPayload::StructuredData(value) = &event.payload {
                eprintln!("[{}] {value}", SkillEventKind::StructuredData);
            }
        }
        StreamEvent::Ended(_) => println!(),
        StreamEvent::Error(err) => eprintln!("error: {err}"),
        StreamEvent::Finished(_) => {}
    }
}

fn print_json(event: &StreamEvent) {
    let line = match event {
        StreamEvent::Started(e)
        | StreamEvent::Log(e)
        | StreamEvent::Chunk(e)
        | StreamEvent::StructuredData(e)
        | StreamEvent::Ended(e) => serde_json::to_value(e).unwrap_or_default(),
        StreamEvent::Error(err) => serde_json::json!({
            "error": err.to_string(),
            "cancelled": err.is_cancelled(),
        }),
        StreamEvent::Finished(outcome) => serde_json::json!({ "finished": outcome }),
    };
    println!("{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeatable_context_flags() {
        let args = Args::try_parse_from([
            "skill-stream",
            "--skill",
            "summary",
            "--resource",
            "r-1",
            "--resource",
            "r-2",
            "--document",
            "d-1",
            "what changed?",
        ])
        .expect("args");
        let request = build_request(&args).expect("request");
        assert_eq!(request.input().query, "what changed?");
        assert_eq!(request.skill_name(), Some("summary"));
        assert_eq!(request.context().resources.len(), 2);
        assert_eq!(request.context().documents[0].doc_id, "d-1");
    }

    #[test]
    fn blank_query_is_rejected() {
        let args = Args::try_parse_from(["skill-stream", "  "]).expect("args");
        assert!(matches!(
            build_request(&args),
            Err(ClientError::Validation(_))
        ));
    }
}
