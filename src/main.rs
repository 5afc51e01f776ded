use cel_lang::{from_json, to_json, to_json_pretty, Environment, Value};
use clap::Parser as ClapParser;
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "cel")]
#[command(about = "Evaluate CEL expressions against a JSON environment")]
#[command(version)]
struct Cli {
    /// The CEL expression to evaluate
    expression: String,

    /// JSON object binding variables (reads from stdin if not provided)
    #[arg(short, long)]
    env: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate syntax, don't evaluate
    #[arg(long)]
    parse_only: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.parse_only {
        cel_lang::compile(&cli.expression)?;
        println!("Syntax is valid");
        return Ok(());
    }

    let input = match cli.env {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let environment = match input {
        Some(text) => environment_from(&text)?,
        None => Environment::new(),
    };

    let result = cel_lang::eval(&cli.expression, &environment)?;
    let rendered = if cli.pretty {
        to_json_pretty(&result)
    } else {
        to_json(&result)
    };
    println!("{}", rendered);
    Ok(())
}

fn environment_from(text: &str) -> Result<Environment, Box<dyn std::error::Error>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    match from_json(&json) {
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()),
        _ => Err("environment must be a JSON object".into()),
    }
}
