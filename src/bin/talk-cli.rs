use clap::{Parser, Subcommand};

use talk_server::client::{PollResult, TalkClient};
use talk_server::Talk;

#[derive(Parser)]
#[command(name = "talk-cli")]
#[command(about = "Command-line client for the talk server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all talks
    List,
    /// Show one talk with its comments
    Show { title: String },
    /// Create or replace a talk
    Create {
        title: String,
        #[arg(short, long)]
        presenter: String,
        #[arg(short, long)]
        summary: String,
    },
    /// Delete a talk
    Delete { title: String },
    /// Comment on a talk
    Comment {
        title: String,
        #[arg(short, long)]
        author: String,
        #[arg(short, long)]
        message: String,
    },
    /// Print the listing every time it changes
    Watch {
        /// Seconds the server may hold each poll
        #[arg(short, long, default_value_t = 90)]
        wait: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = TalkClient::new(&cli.url)?;

    match cli.command {
        Commands::List => {
            let (version, talks) = client.list().await?;
            println!("version {version}");
            print_talks(&talks);
        }
        Commands::Show { title } => match client.get(&title).await? {
            Some(talk) => print_talks(std::slice::from_ref(&talk)),
            None => eprintln!("No talk \"{title}\" found"),
        },
        Commands::Create {
            title,
            presenter,
            summary,
        } => client.put(&title, &presenter, &summary).await?,
        Commands::Delete { title } => client.delete(&title).await?,
        Commands::Comment {
            title,
            author,
            message,
        } => client.comment(&title, &author, &message).await?,
        Commands::Watch { wait } => watch(&client, wait).await?,
    }

    Ok(())
}

async fn watch(client: &TalkClient, wait: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut known = None;
    loop {
        match client.poll(known, Some(wait)).await {
            Ok(PollResult::Changed { version, talks }) => {
                println!("--- version {version} ---");
                print_talks(&talks);
                known = Some(version);
            }
            Ok(PollResult::NotModified) => {}
            Err(e) => {
                eprintln!("Request failed: {e}");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
        }
    }
}

fn print_talks(talks: &[Talk]) {
    for talk in talks {
        println!("{} (by {})", talk.title, talk.presenter);
        println!("    {}", talk.summary);
        for comment in &talk.comments {
            println!("    {}: {}", comment.author, comment.message);
        }
    }
}
