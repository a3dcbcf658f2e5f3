mod debug_report;

use statescript::compiler::{BoolConverter, FloatConverter, IntConverter, ValueConverter};
use statescript::{ActionRegistry, CompilerOptions, Context, MessageBus, Value, compile_verbose_with, regex};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STATESCRIPT_LOG";

fn main() {
    init_logging();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let options = CompilerOptions::default();
    let registry: ActionRegistry<()> = match ActionRegistry::with_builtins(&options) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let out = match compile_verbose_with(&config.source, &registry, &options) {
        Ok(out) => out,
        Err(err) => {
            debug_report::print_compile_error(&config.name, &config.source, &err, config.color);
            std::process::exit(1);
        }
    };
    debug_report::print_compile(&config.name, &out.machine, &out.details, config.color);

    if config.ticks == 0 {
        return;
    }

    let mut bus = MessageBus::new(config.sends.len().max(1));
    let mut ctx = Context::default();
    let mut fatal = false;
    let mut trace = Vec::with_capacity(config.ticks);

    for tick in 1..=config.ticks {
        let mut delivered = Vec::new();
        for send in config.sends.iter().filter(|s| s.tick == tick) {
            if let Err(err) = bus.enqueue(&send.key, 0, send.value.clone()) {
                tracing::warn!(%err, key = %send.key, "message dropped");
            }
        }
        while let Some(envelope) = bus.dequeue_first() {
            ctx.reset_error();
            let result = out.machine.send_message(&mut ctx, envelope);
            delivered.push((envelope.key.clone(), result, ctx.last_error()));
            envelope.recycle();
        }

        out.machine.tick(&mut ctx);
        fatal |= ctx.last_error().is_some_and(|e| e.is_fatal());
        trace.push(debug_report::TickLine {
            tick,
            state: out.machine.current_state(&ctx).map(|s| s.name().to_string()),
            exec: *ctx.exec_state(),
            error: ctx.last_error(),
            delivered,
        });
    }

    debug_report::print_ticks(&trace, config.color);
    if fatal {
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

struct CliConfig {
    name: String,
    source: String,
    ticks: usize,
    sends: Vec<ScheduledSend>,
    color: bool,
}

struct ScheduledSend {
    key: String,
    value: Option<Value>,
    tick: usize,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut path: Option<String> = None;
    let mut ticks = 0usize;
    let mut sends = Vec::new();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("statescript {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--ticks" | "-t" => {
                let value = args.next().ok_or_else(|| "error: --ticks expects a value".to_string())?;
                ticks = parse_ticks(&value)?;
            }
            "--send" | "-s" => {
                let value = args.next().ok_or_else(|| "error: --send expects a value".to_string())?;
                sends.push(parse_send(&value)?);
            }
            _ if arg.starts_with("--ticks=") => ticks = parse_ticks(arg.trim_start_matches("--ticks="))?,
            _ if arg.starts_with("--send=") => sends.push(parse_send(arg.trim_start_matches("--send="))?),
            "-" => set_path(&mut path, arg)?,
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => set_path(&mut path, arg)?,
        }
    }

    if let Some(send) = sends.iter().find(|s| s.tick == 0 || s.tick > ticks) {
        return Err(format!(
            "error: --send '{}' is scheduled for tick {} but only {ticks} tick(s) run",
            send.key, send.tick
        ));
    }

    let (name, source) = match path.as_deref() {
        None | Some("-") => ("<stdin>".to_string(), read_stdin_input()?),
        Some(file) => {
            let source = std::fs::read_to_string(file).map_err(|err| format!("error: cannot read '{file}': {err}"))?;
            (file.to_string(), source)
        }
    };

    if source.trim().is_empty() {
        return Err(format!("error: no script provided\n\n{}", help_text()));
    }

    Ok(CliConfig { name, source, ticks, sends, color })
}

fn set_path(path: &mut Option<String>, arg: String) -> Result<(), String> {
    if path.is_some() {
        return Err("error: script provided multiple times".to_string());
    }
    *path = Some(arg);
    Ok(())
}

fn parse_ticks(value: &str) -> Result<usize, String> {
    value.parse().map_err(|_| format!("error: invalid --ticks '{value}' (expected a non-negative integer)"))
}

/// `key@tick` or `key:value@tick`. The value becomes an int, float or bool
/// when it reads as one, a string otherwise.
fn parse_send(value: &str) -> Result<ScheduledSend, String> {
    let caps = regex!(r"^([^@:\s]+)(?::([^@]*))?@(\d+)$")
        .captures(value)
        .ok_or_else(|| format!("error: invalid --send '{value}' (expected key@tick or key:value@tick)"))?;

    let key = caps[1].to_string();
    let tick = caps[3].parse().map_err(|_| format!("error: invalid tick in --send '{value}'"))?;
    let value = caps.get(2).map(|m| typed_value(m.as_str()));

    Ok(ScheduledSend { key, value, tick })
}

fn typed_value(literal: &str) -> Value {
    let converters: [&dyn ValueConverter; 3] = [&IntConverter, &FloatConverter, &BoolConverter];
    converters.iter().find_map(|c| c.try_convert(literal)).unwrap_or_else(|| Value::from(literal))
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "statescript {version}

Compile a behavior script and optionally tick it.

Usage:
  statescript [OPTIONS] [<script>]

  Reads the script from stdin when <script> is omitted or '-'.

Options:
  -t, --ticks <n>            Tick a fresh context n times after compiling.
                             Default: 0 (compile only).
  -s, --send <key@tick>      Deliver message <key> right before tick <tick>.
                             Use key:value@tick to attach a value. Repeatable.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}            Log filter (tracing syntax). Default: warn.

Exit codes:
  0  Success.
  1  Compile error, or a fatal runtime error while ticking.
  2  Invalid arguments or missing script.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_without_value() {
        let send = parse_send("seen@3").unwrap();
        assert_eq!((send.key.as_str(), send.tick, send.value), ("seen", 3, None));
    }

    #[test]
    fn send_values_are_typed() {
        assert_eq!(parse_send("hp:12@1").unwrap().value, Some(Value::Int(12)));
        assert_eq!(parse_send("speed:1.5@1").unwrap().value, Some(Value::Float(1.5)));
        assert_eq!(parse_send("alert:yes@1").unwrap().value, Some(Value::Bool(true)));
        assert_eq!(parse_send("say:hello there@1").unwrap().value, Some(Value::from("hello there")));
    }

    #[test]
    fn malformed_sends() {
        for bad in ["seen", "seen@", "@2", "seen@x", "a b@1"] {
            assert!(parse_send(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn ticks_must_be_numbers() {
        assert_eq!(parse_ticks("5"), Ok(5));
        assert!(parse_ticks("-1").is_err());
    }
}
