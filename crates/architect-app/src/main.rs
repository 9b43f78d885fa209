use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use architect_app::{
    AppConfig, GenerateOutcome, HttpGenerationClient, SessionController, SystemClipboard, Timings,
};
use architect_core::{FileStore, Mode, Session};

const HELP: &str = "\
Type your idea or prompt on one line to set the input.
Commands:
  :mode <improve|idea|expert>   switch transformation mode
  :modes                        list modes
  :generate                     send the input for refinement
  :copy                         copy the last result to the clipboard
  :show                         print the current session
  :help                         this text
  :quit                         save and exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = AppConfig::from_env();
    log::info!(
        "using proxy at {} and state in {}",
        config.endpoint,
        config.data_dir.display()
    );

    let controller = SessionController::load(
        Arc::new(HttpGenerationClient::new(&config.endpoint)),
        Arc::new(FileStore::new(&config.data_dir)),
        Arc::new(SystemClipboard::new()),
        Timings::default(),
    );

    println!("Prompt Architect - transform vague ideas into structured AI prompts.");
    println!("{HELP}\n");
    print_session(&controller.snapshot());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = interrupted();
    tokio::pin!(ctrl_c);
    while let Some(line) = next_line(&mut lines, ctrl_c.as_mut()).await? {
        let line = line.trim_end();
        let (command, arg) = match line.strip_prefix(':') {
            Some(rest) => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                (
                    Some(parts.next().unwrap_or("")),
                    parts.next().unwrap_or("").trim(),
                )
            }
            None => (None, ""),
        };

        match command {
            None => {
                controller.set_input(line);
                println!("{}", input_set_message(line));
            }
            Some("mode" | "m") => match arg.parse::<Mode>() {
                Ok(mode) => {
                    controller.set_mode(mode);
                    println!("mode: {} - {}", mode.label(), mode.description());
                }
                Err(e) => println!("{e}"),
            },
            Some("modes") => {
                let current = controller.snapshot().mode;
                for mode in Mode::ALL {
                    let marker = if mode == current { '*' } else { ' ' };
                    println!("{marker} {:<8} {} - {}", mode.as_str(), mode.label(), mode.description());
                }
            }
            Some("generate" | "g") => {
                if controller.snapshot().is_loading {
                    println!("a generation is already running");
                    continue;
                }
                println!("Architecting prompt...");
                match controller.generate().await {
                    GenerateOutcome::Completed => {
                        println!("\n--- Generated Prompt ---\n{}", controller.snapshot().output_text);
                        println!("--- Is this correct? If not, tell me what to adjust. ---\n");
                    }
                    GenerateOutcome::Failed | GenerateOutcome::Rejected => {
                        println!("error: {}", controller.snapshot().error_message);
                    }
                    GenerateOutcome::Superseded => {}
                }
            }
            Some("copy" | "c") => {
                if controller.copy_output() {
                    println!("Copied!");
                } else if controller.snapshot().output_text.is_empty() {
                    println!("nothing to copy yet");
                }
            }
            Some("show" | "s") => print_session(&controller.snapshot()),
            Some("help" | "h" | "?") => println!("{HELP}"),
            Some("quit" | "q" | "exit") => break,
            Some(other) => println!("unknown command :{other} (try :help)"),
        }
    }

    controller.flush()?;
    log::info!("session saved");
    Ok(())
}

/// The next input line, or `None` at end of input or once `stop` resolves.
/// Either way the caller falls through to the final flush.
async fn next_line<R>(
    lines: &mut Lines<R>,
    stop: Pin<&mut impl Future<Output = ()>>,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => line,
        () = stop => Ok(None),
    }
}

fn input_set_message(input: &str) -> String {
    format!("input set ({} chars)", input.chars().count())
}

/// Resolves on Ctrl-C. If the signal can't be watched, never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn print_session(session: &Session) {
    println!("mode:   {} ({})", session.mode.label(), session.mode.as_str());
    if session.input_text.is_empty() {
        println!("input:  <{}>", session.mode.placeholder());
    } else {
        println!("input:  {}", session.input_text);
    }
    if !session.error_message.is_empty() {
        println!("error:  {}", session.error_message);
    }
    if !session.output_text.is_empty() {
        println!("output:\n{}", session.output_text);
    }
    if let Some(saved) = session.last_saved {
        println!("saved:  {}", saved.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}
