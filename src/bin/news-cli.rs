use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use merpati_news::client::{BrowserState, HttpSource, NewsBrowser};
use merpati_news::models::Category;

#[derive(Parser)]
#[command(name = "news-cli")]
#[command(about = "Browse news from a running Merpati News server", long_about = None)]
struct Cli {
    /// Base URL of the Merpati News server
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    /// Initial search text
    #[arg(short, long, default_value = "")]
    query: String,

    /// Initial category filter
    #[arg(short, long, default_value = "general")]
    category: Category,
}

enum Command {
    Search(String),
    Category(String),
    Categories,
    Retry,
    Quit,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line.split_once(' ') {
        Some(("/search", text)) => Command::Search(text.trim().to_string()),
        Some(("/category", name)) => Command::Category(name.trim().to_string()),
        _ => match line {
            "/search" => Command::Search(String::new()),
            "/categories" => Command::Categories,
            "/retry" => Command::Retry,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Search(line.to_string()),
        },
    }
}

fn print_help() {
    println!("Commands: /search <text>, /category <name>, /categories, /retry, /quit");
    println!("Any other line is used as the search text.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let source = HttpSource::new(&cli.server)?;
    println!("Reading news from {}", source.endpoint());

    let state = BrowserState::with_filters(&cli.query, cli.category);
    let mut browser = NewsBrowser::with_state(source, state);

    browser.mount().await;
    println!("{}", browser.state().view());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Search(text) => browser.search(&text).await,
            Command::Category(name) => match name.parse::<Category>() {
                Ok(category) => browser.select_category(category).await,
                Err(e) => {
                    eprintln!("{}", e);
                    continue;
                }
            },
            Command::Categories => {
                for category in Category::ALL {
                    println!("{:<14} {}", category.as_str(), category.label());
                }
                continue;
            }
            Command::Retry => browser.retry().await,
            Command::Quit => break,
        }

        println!("{}", browser.state().view());
    }

    Ok(())
}
