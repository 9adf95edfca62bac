use anyhow::Result;
use log::info;

use crate::{
    cli::{LookupArgs, OutputFormat},
    config::Settings,
    derive::MetricDefinition,
    open_session,
    report::{self, render_core_text, render_field_text},
};

pub fn execute(args: &LookupArgs) -> Result<()> {
    let mut settings = Settings::resolve(&args.source)?;
    for definition in &args.metrics {
        settings.metrics.push(MetricDefinition::parse(definition)?);
    }
    let session = open_session(settings)?;

    if let Some(dimension) = &args.field {
        let field = session.field(&args.core, dimension)?;
        match args.format {
            OutputFormat::Table => println!("{}", render_field_text(&args.core, &field)),
            OutputFormat::Json => println!("{}", report::to_json(&field)?),
        }
        return Ok(());
    }

    let reports = if args.all {
        session.query_all(&args.core)?
    } else {
        vec![session.query(&args.core)?]
    };
    match args.format {
        OutputFormat::Table => {
            let rendered = reports.iter().map(render_core_text).collect::<Vec<_>>();
            print!("{}", rendered.join("\n"));
        }
        OutputFormat::Json if args.all => println!("{}", report::to_json(&reports)?),
        OutputFormat::Json => println!("{}", report::to_json(&reports[0])?),
    }
    info!(
        "Resolved {} row(s) for core '{}'",
        reports.len(),
        args.core.trim()
    );
    Ok(())
}
