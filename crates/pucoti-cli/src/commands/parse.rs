use clap::Args;
use pucoti_core::format::format_time_preview;
use pucoti_core::parse_command;

#[derive(Args)]
pub struct ParseArgs {
    /// Input line, e.g. `write the intro 45m`
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    input: Vec<String>,
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ParseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_command(&args.input.join(" "));
    if args.json {
        println!("{}", serde_json::to_string(&parsed)?);
        return Ok(());
    }

    let intent = if parsed.intent.is_empty() {
        "(none)"
    } else {
        parsed.intent.as_str()
    };
    println!("intent:   {intent}");
    match parsed.seconds {
        Some(seconds) => println!("duration: {} ({seconds}s)", format_time_preview(seconds)),
        None => println!("duration: (none, timebox)"),
    }
    Ok(())
}
