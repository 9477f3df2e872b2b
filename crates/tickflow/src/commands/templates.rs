//! Templates command - lists the task templates the CLI can build.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the templates command.
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Show default arguments and documentation
    #[arg(short, long)]
    pub long: bool,
}

/// Run the templates command.
pub async fn run(args: TemplatesArgs, ctx: &Context) -> Result<()> {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    let detailed = args.long || ctx.verbose;

    for factory in super::factories() {
        println!("{} - {}", bold.apply_to(factory.name()), factory.description());
        for template in factory.templates() {
            let spec = template.spec();
            println!("  {:<20} {}", template.template(), spec.description);
            if detailed {
                if !spec.arguments.is_empty() {
                    println!("  {:<20} {}", "", dim.apply_to(&spec.arguments));
                }
                if !spec.documentation.is_empty() {
                    println!("  {:<20} {}", "", dim.apply_to(&spec.documentation));
                }
            }
        }
    }
    Ok(())
}
