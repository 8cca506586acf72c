use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use scriptsense_core::api::{SaveFormat, TextArea};
use scriptsense_core::Config;

mod account;
mod auth;
mod context;
mod jobs;
mod output;
mod text;

use context::Context;

/// ScriptSense - digitize, translate and export handwritten documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to a config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the session file
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Directory holding the Noto Sans script fonts for PDF export
    #[arg(long, global = true)]
    font_dir: Option<PathBuf>,

    /// Status poll interval in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Give up polling after this many seconds (0 = never)
    #[arg(long, global = true)]
    max_poll_secs: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Verify the stored session with the backend
    Whoami,
    /// Upload a document, wait for processing and print the result
    Upload {
        file: PathBuf,
        /// Source language code (e.g. ta, hi)
        #[arg(long = "from")]
        source_lang: Option<String>,
        /// Target language code
        #[arg(long = "to")]
        target_lang: Option<String>,
        /// Detect the source language before uploading
        #[arg(long)]
        detect: bool,
        #[command(flatten)]
        result: ResultArgs,
    },
    /// Poll an existing job until it finishes
    Watch {
        job_id: String,
        #[command(flatten)]
        result: ResultArgs,
    },
    /// Show the current status of a job once
    Status { job_id: String },
    /// Cancel a running job
    Cancel { job_id: String },
    /// Detect the language of a document
    Detect { file: PathBuf },
    /// Send edited text for reprocessing
    Reprocess {
        /// File with the edited text
        input: PathBuf,
        /// Language of the text panel
        #[arg(long = "lang")]
        lang: String,
        #[arg(long, value_enum, default_value_t = AreaArg::Translated)]
        area: AreaArg,
    },
    /// Render edited text on the server and download it
    SaveEdit {
        input: PathBuf,
        #[arg(long = "lang")]
        lang: String,
        #[arg(long, value_enum, default_value_t = SaveFormatArg::Pdf)]
        format: SaveFormatArg,
        /// Where to store the rendered file (default: print the link only)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Download a server-generated file
    Download { link: String, output: PathBuf },
    /// Export text to PDF or DOC locally
    Export {
        input: PathBuf,
        #[arg(long = "lang", default_value = "en")]
        lang: String,
        #[arg(long, value_enum, default_value_t = AreaArg::Translated)]
        area: AreaArg,
        /// Output file; `.pdf` or `.doc` selects the format
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<ExportFormatArg>,
    },
    /// Bucket word confidence scores (0..1)
    Histogram {
        #[arg(required = true, num_args = 1..)]
        scores: Vec<f64>,
    },
    /// Send feedback
    Feedback { text: String },
    /// List recently uploaded documents
    Recent,
    /// Show upload history
    History,
    /// Administrative views
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List all users
    Users,
    /// Show a user's feedback
    Feedback { email: String },
    /// Show a user's upload history
    History { email: String },
}

#[derive(clap::Args, Debug, Clone)]
struct ResultArgs {
    /// Print the raw result as JSON
    #[arg(long)]
    json: bool,
    /// Export the result text to this file (.pdf or .doc)
    #[arg(long)]
    export: Option<PathBuf>,
    /// Which text to export
    #[arg(long, value_enum, default_value_t = AreaArg::Translated)]
    export_area: AreaArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum AreaArg {
    Extracted,
    Translated,
}

impl From<AreaArg> for TextArea {
    fn from(a: AreaArg) -> Self {
        match a {
            AreaArg::Extracted => TextArea::Extracted,
            AreaArg::Translated => TextArea::Translated,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SaveFormatArg {
    Pdf,
    Docx,
}

impl From<SaveFormatArg> for SaveFormat {
    fn from(f: SaveFormatArg) -> Self {
        match f {
            SaveFormatArg::Pdf => SaveFormat::Pdf,
            SaveFormatArg::Docx => SaveFormat::Docx,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormatArg {
    Pdf,
    Doc,
}

impl From<ExportFormatArg> for scriptsense_export::ExportFormat {
    fn from(f: ExportFormatArg) -> Self {
        match f {
            ExportFormatArg::Pdf => scriptsense_export::ExportFormat::Pdf,
            ExportFormatArg::Doc => scriptsense_export::ExportFormat::Doc,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    // Resolve config from CLI flags > env vars > config file > defaults
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(path) = args.session {
        config.session_path = path;
    }
    if let Some(dir) = args.font_dir {
        config.font_dir = Some(dir);
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms.max(1));
    }
    if let Some(secs) = args.max_poll_secs {
        config.max_poll_duration = (secs > 0).then(|| Duration::from_secs(secs));
    }
    log::debug!("using backend {}", config.api_url);

    let ctx = Context::new(config, !args.no_color);

    match args.command {
        Command::Login { email, password } => auth::login(&ctx, &email, &password).await,
        Command::Signup {
            name,
            email,
            password,
        } => auth::signup(&ctx, &name, &email, &password).await,
        Command::Logout => auth::logout(&ctx),
        Command::Whoami => auth::whoami(&ctx).await,
        Command::Upload {
            file,
            source_lang,
            target_lang,
            detect,
            result,
        } => {
            let form = scriptsense_core::upload::UploadForm {
                file: Some(file),
                source_lang,
                target_lang,
            };
            jobs::upload(&ctx, form, detect, &result.into()).await
        }
        Command::Watch { job_id, result } => jobs::watch(&ctx, &job_id, &result.into()).await,
        Command::Status { job_id } => jobs::status(&ctx, &job_id).await,
        Command::Cancel { job_id } => jobs::cancel(&ctx, &job_id).await,
        Command::Detect { file } => jobs::detect(&ctx, &file).await,
        Command::Reprocess { input, lang, area } => {
            text::reprocess(&ctx, &input, &lang, area.into()).await
        }
        Command::SaveEdit {
            input,
            lang,
            format,
            output,
        } => text::save_edit(&ctx, &input, &lang, format.into(), output.as_deref()).await,
        Command::Download { link, output } => text::download(&ctx, &link, &output).await,
        Command::Export {
            input,
            lang,
            area,
            output,
            format,
        } => text::export(&ctx, &input, &lang, area.into(), output, format.map(Into::into)),
        Command::Histogram { scores } => {
            text::histogram(&ctx, &scores);
            Ok(())
        }
        Command::Feedback { text } => account::feedback(&ctx, &text).await,
        Command::Recent => account::recent(&ctx).await,
        Command::History => account::history(&ctx, None).await,
        Command::Admin { command } => match command {
            AdminCommand::Users => account::admin_users(&ctx).await,
            AdminCommand::Feedback { email } => account::admin_feedback(&ctx, &email).await,
            AdminCommand::History { email } => account::history(&ctx, Some(&email)).await,
        },
    }
}

impl From<ResultArgs> for jobs::ResultOptions {
    fn from(a: ResultArgs) -> Self {
        jobs::ResultOptions {
            json: a.json,
            export: a.export,
            export_area: a.export_area.into(),
        }
    }
}
