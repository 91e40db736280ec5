use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pagenote_core::{
    AnnotationDraft, DefaultImageFetcher, DocumentSession, FileEncoder, PagenoteConfig,
    PayloadEncoder, PressOutcome, ScreenPoint,
};
use pagenote_doc_model::{Annotation, AnnotationId, AnnotationPatch, DocPoint, Document, Page};
use pagenote_storage::{InMemorySource, JsonDocumentSource};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type Session = DocumentSession<JsonDocumentSource, DefaultImageFetcher>;

#[derive(Debug, Parser)]
#[command(name = "pagenote")]
#[command(about = "Annotate paged documents")]
pub struct Cli {
    /// Document directory. Defaults to the per-user data directory.
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,
    /// TOML configuration file. Defaults to PAGENOTE_* environment variables.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a document whose pages are `pages/<n>.png`.
    Init {
        #[arg(long)]
        name: String,
        #[arg(long)]
        pages: u32,
        #[arg(long, default_value = "1")]
        id: String,
        /// Replace an existing document and drop its annotations.
        #[arg(long)]
        force: bool,
    },
    /// Print the document and its annotations as JSON.
    Show {
        /// Only list annotations on this page.
        #[arg(long)]
        page: Option<u32>,
    },
    /// Add a text annotation.
    AddText {
        #[command(flatten)]
        at: Placement,
        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// Add an image annotation referenced by URL or path.
    AddImage {
        #[command(flatten)]
        at: Placement,
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Add an image annotation embedded from a local file.
    AddUpload {
        #[command(flatten)]
        at: Placement,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Drag an annotation with pointer positions given in screen pixels.
    Drag {
        #[arg(value_name = "ID")]
        id: AnnotationId,
        #[arg(long, value_name = "X,Y", value_parser = parse_point, allow_hyphen_values = true)]
        from: ScreenPoint,
        /// Pointer positions while the button is held, one frame each.
        #[arg(long = "to", value_name = "X,Y", value_parser = parse_point, allow_hyphen_values = true, required = true)]
        to: Vec<ScreenPoint>,
        /// Zoom steps to apply before dragging.
        #[arg(long, default_value_t = 0)]
        zoom_in: u32,
        #[arg(long, default_value_t = 0)]
        zoom_out: u32,
    },
    /// Replace the content of a text annotation.
    UpdateText {
        #[arg(value_name = "ID")]
        id: AnnotationId,
        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// Delete an annotation.
    Delete {
        #[arg(value_name = "ID")]
        id: AnnotationId,
    },
    /// Apply zoom steps and print the resulting level.
    Zoom {
        #[arg(value_enum, required = true)]
        steps: Vec<ZoomStep>,
    },
}

/// Document-space placement of a new annotation
#[derive(Debug, Args)]
struct Placement {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    y: f64,
}

impl Placement {
    fn position(&self) -> DocPoint {
        DocPoint::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ZoomStep {
    In,
    Out,
    Reset,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput<'a> {
    id: String,
    name: &'a str,
    pages: &'a [Page],
    annotations: Vec<&'a Annotation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZoomOutput {
    zoom: f64,
    zoom_percentage: u32,
    rejected_steps: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing();

    let config = load_config(cli.config.as_deref())?;
    let dir = cli.dir.as_deref();

    match cli.command {
        Commands::Init { name, pages, id, force } => run_init(open_source(dir)?, &name, pages, &id, force),
        Commands::Show { page } => run_show(&open_session(open_source(dir)?, config)?, page),
        Commands::AddText { at, text } => {
            run_add(open_session(open_source(dir)?, config)?, AnnotationDraft::Text(text), &at)
        }
        Commands::AddImage { at, url } => {
            run_add(open_session(open_source(dir)?, config)?, AnnotationDraft::ImageUrl(url), &at)
        }
        Commands::AddUpload { at, file } => run_add_upload(open_session(open_source(dir)?, config)?, &file, &at),
        Commands::Drag { id, from, to, zoom_in, zoom_out } => {
            let mut session = open_session(open_source(dir)?, config)?;
            for _ in 0..zoom_in {
                session.zoom_in();
            }
            for _ in 0..zoom_out {
                session.zoom_out();
            }
            run_drag(session, id, from, &to)
        }
        Commands::UpdateText { id, text } => run_update_text(open_session(open_source(dir)?, config)?, id, text),
        Commands::Delete { id } => run_delete(open_session(open_source(dir)?, config)?, id),
        Commands::Zoom { steps } => run_zoom(config, &steps),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAGENOTE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn load_config(path: Option<&Path>) -> Result<PagenoteConfig> {
    match path {
        Some(path) => PagenoteConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => PagenoteConfig::from_env().context("invalid PAGENOTE_* environment"),
    }
}

fn open_source(dir: Option<&Path>) -> Result<JsonDocumentSource> {
    match dir {
        Some(dir) => Ok(JsonDocumentSource::with_root(dir)),
        None => JsonDocumentSource::from_default_project().context("no document directory given"),
    }
}

fn open_session(source: JsonDocumentSource, config: PagenoteConfig) -> Result<Session> {
    let id = source
        .document_id()
        .with_context(|| format!("no document in {}", source.root().display()))?;
    let fetcher = DefaultImageFetcher::from_config(&config).with_base_dir(source.root());

    let mut session = DocumentSession::new(source, fetcher, config);
    pollster::block_on(session.load(&id)).context("failed to load document")?;
    Ok(session)
}

fn save(session: &mut Session) -> Result<()> {
    pollster::block_on(session.save_document()).context("failed to save document")?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn run_init(source: JsonDocumentSource, name: &str, pages: u32, id: &str, force: bool) -> Result<()> {
    if pages == 0 {
        anyhow::bail!("--pages must be >= 1");
    }
    if source.exists() && !force {
        anyhow::bail!("a document already exists in {} (use --force to replace it)", source.root().display());
    }

    let pages = (1..=pages).map(|number| Page { number, image_url: format!("pages/{number}.png") }).collect();
    source.create(id, &Document::new(name, pages)).context("failed to create document")?;

    println!("{}", source.root().display());
    Ok(())
}

fn run_show(session: &Session, page: Option<u32>) -> Result<()> {
    let document = session.document().context("no document loaded")?;
    let annotations = match page {
        Some(page) => session.annotations_on_page(page),
        None => session.annotations().iter().collect(),
    };

    print_json(&ShowOutput {
        id: session.source().document_id()?,
        name: &document.name,
        pages: &document.pages,
        annotations,
    })
}

fn run_add(mut session: Session, draft: AnnotationDraft, at: &Placement) -> Result<()> {
    let created = pollster::block_on(session.add_draft(draft, at.position(), at.page))
        .context("failed to add annotation")?;
    save(&mut session)?;
    print_json(&created)
}

fn run_add_upload(session: Session, file: &Path, at: &Placement) -> Result<()> {
    let payload = pollster::block_on(FileEncoder.encode_file(file)).context("failed to encode upload")?;
    run_add(session, AnnotationDraft::Upload(payload), at)
}

fn run_drag(mut session: Session, id: AnnotationId, from: ScreenPoint, to: &[ScreenPoint]) -> Result<()> {
    if session.press_annotation(id, from) == PressOutcome::Ignored {
        anyhow::bail!("annotation with id {id} not found");
    }

    for &point in to {
        session.pointer_move(point);
        for (moved, position) in session.frame() {
            tracing::debug!(id = %moved, x = position.x, y = position.y, "drag frame");
        }
    }

    let committed = session.pointer_release().context("failed to commit drag")?;
    save(&mut session)?;
    match committed.first() {
        Some(annotation) => print_json(annotation),
        None => anyhow::bail!("drag of {id} was not committed"),
    }
}

fn run_update_text(mut session: Session, id: AnnotationId, text: String) -> Result<()> {
    AnnotationDraft::Text(text.clone()).validate(session.config()).context("invalid text")?;

    let updated = session
        .update_annotation(id, &AnnotationPatch::content(text.trim()))
        .context("failed to update annotation")?;
    save(&mut session)?;
    print_json(&updated)
}

fn run_delete(mut session: Session, id: AnnotationId) -> Result<()> {
    session.delete_annotation(id).context("failed to delete annotation")?;
    save(&mut session)?;
    println!("deleted {id}");
    Ok(())
}

fn run_zoom(config: PagenoteConfig, steps: &[ZoomStep]) -> Result<()> {
    let fetcher = DefaultImageFetcher::from_config(&config);
    let mut session = DocumentSession::new(InMemorySource::new(), fetcher, config);

    let mut rejected_steps = 0;
    for step in steps {
        let applied = match step {
            ZoomStep::In => session.zoom_in(),
            ZoomStep::Out => session.zoom_out(),
            ZoomStep::Reset => {
                session.reset_zoom();
                true
            }
        };
        if !applied {
            rejected_steps += 1;
        }
    }

    print_json(&ZoomOutput { zoom: session.zoom(), zoom_percentage: session.zoom_percentage(), rejected_steps })
}

fn parse_point(value: &str) -> Result<ScreenPoint, String> {
    let (x, y) = value.split_once(',').ok_or_else(|| format!("expected X,Y, got {value}"))?;
    let x = x.trim().parse().map_err(|_| format!("invalid x coordinate: {x}"))?;
    let y = y.trim().parse().map_err(|_| format!("invalid y coordinate: {y}"))?;
    Ok(ScreenPoint::new(x, y))
}
