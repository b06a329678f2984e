use std::fs;

use tracing::{info, span, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{FoldpaneError, Result};
use crate::feedback::FeedbackDocument;
use crate::registry::RendererRegistry;
use crate::render::RenderContext;
use crate::view::PaneView;

mod error;
/// Dispatch of synthetic events against the element tree
mod events;
/// Presentation model of one feedback document
mod feedback;
/// Derivation of the model from raw reader exports
mod mapper;
/// Selector matching over the element tree
mod query;
mod registry;
/// Pane markup renderers
mod render;
/// Wiring of the section fold interaction
mod toggle;
/// Parse, wire, click and serialize facade
mod view;

struct Args {
    pub input: String,
    pub output: String,
    pub mode: String,
    pub clicks: Vec<String>,
    pub from_export: bool,
    pub wire: bool,
    pub trace: bool,
}

fn main() {
    let args = parse_args().expect("Could not parse arguments");
    if args.trace {
        tracing_subscriber::fmt::fmt()
            .with_span_events(FmtSpan::ACTIVE)
            .with_max_level(Level::DEBUG)
            .with_env_filter(EnvFilter::from_default_env())
            .finish()
            .init();
        info!("Logger initialized");
    }

    if let Err(e) = run(&args) {
        eprintln!("foldpane: {e}");
        std::process::exit(1);
    }
}

fn parse_args() -> std::result::Result<Args, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();
    let args = Args {
        mode: pargs
            .opt_value_from_str("--mode")?
            .unwrap_or_else(|| "feedback".to_string()),
        clicks: pargs.values_from_str("--click")?,
        from_export: pargs.contains("--from-export"),
        wire: !pargs.contains("--no-wire"),
        trace: pargs.contains(["--trace", "-t"]),
        input: pargs.free_from_str()?,
        output: pargs.free_from_str()?,
    };
    Ok(args)
}

fn run(args: &Args) -> Result<()> {
    let feedback = load_document(args)?;
    let title = feedback.document_title.clone();

    let modes = registry::builtin_modes();
    let mode = registry::find_mode(&modes, &args.mode)
        .ok_or_else(|| FoldpaneError::UnknownMode(args.mode.clone()))?;
    let renderers = RendererRegistry::with_builtin_renderers();
    let renderer = renderers
        .renderer(&mode.handler)
        .ok_or_else(|| FoldpaneError::UnknownHandler(mode.handler.clone()))?;

    let result = renderer.render(&RenderContext::new().with_payload(feedback))?;
    let mut view = PaneView::from_render_result(&result)?;

    if args.wire {
        let wired = view.wire_section_toggles()?;
        info!(wired, mode = %mode.key, "wired section toggles");
    }
    for selector in &args.clicks {
        let actions = view.click(selector)?;
        info!(%selector, actions, "dispatched click");
    }

    let span = span!(Level::DEBUG, "Saving result");
    let _enter = span.enter();
    fs::write(&args.output, view.page_markup(&title))?;
    Ok(())
}

/// Reads the input file as a presentation document, or as a raw reader
/// export mapped through the feedback mapper when `--from-export` is
/// given.
fn load_document(args: &Args) -> Result<FeedbackDocument> {
    let raw = fs::read_to_string(&args.input)?;
    if args.from_export {
        let source: mapper::FeedbackSource = serde_json::from_str(&raw)?;
        Ok(mapper::map_source(&source))
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}
