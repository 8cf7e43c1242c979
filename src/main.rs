use canopy::{CanopyConfig, CanopyError, PageRenderer, RenderOutcome, render_document};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Render a canopy page to HTML.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Project file holding all components and packages
    #[arg(long, conflicts_with = "components", required_unless_present = "components")]
    project: Option<PathBuf>,

    /// Directory with components/ and packages/<name>/components/
    #[arg(long)]
    components: Option<PathBuf>,

    /// Page component to render
    #[arg(long)]
    page: String,

    /// Absolute URL of the request being rendered
    #[arg(long, default_value = "http://localhost/")]
    url: String,

    /// Configuration file (toml, json or yaml)
    #[arg(long, env = "CANOPY_CONFIG")]
    config: Option<PathBuf>,

    /// Print only the page markup instead of a full document
    #[arg(long, default_value_t = false)]
    fragment: bool,

    /// Output file; stdout when absent
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CanopyError> {
    env_logger::init();
    let args = Args::parse();

    let config = CanopyConfig::load(args.config.as_deref())?;
    let builder = PageRenderer::builder().with_config(config);
    let builder = match (&args.project, &args.components) {
        (Some(project), _) => builder.with_project_file(project)?,
        (None, Some(dir)) => builder.with_component_dir(dir),
        (None, None) => {
            return Err(CanopyError::Setup(
                "either --project or --components is required".to_string(),
            ));
        }
    };
    let renderer = builder.build()?;

    let page = match renderer.render(&args.page, &args.url).await? {
        RenderOutcome::Redirect(redirect) => {
            eprintln!("{} redirect to {}", redirect.status_code, redirect.location);
            return Ok(());
        }
        RenderOutcome::Page(page) => page,
    };
    for diagnostic in &page.diagnostics {
        log::warn!("{}: {}", diagnostic.component, diagnostic.message);
    }

    let output = if args.fragment {
        page.html
    } else {
        render_document(&page, &renderer.config().document)
    };
    match args.output {
        Some(path) => fs::write(&path, output)?,
        None => println!("{}", output),
    }
    Ok(())
}
