use interview_os::catalog::Catalog;
use interview_os::config;
use interview_os::router::Route;

fn main() {
    let initial_path = match handle_cli_flags() {
        CliAction::Exit => return,
        CliAction::Run(path) => path,
    };

    if let Err(err) = interview_os::run(interview_os::RunOptions { initial_path }) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

enum CliAction {
    Exit,
    Run(Option<String>),
}

fn handle_cli_flags() -> CliAction {
    let mut saw_flag = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("InterviewOS {}", interview_os::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "InterviewOS - Study technical-interview topics from the terminal.\n\nUsage: interview-os [OPTIONS] [PATH]\n\n  PATH                 Route to open first, e.g. /topic/databases/acid\n  --list-topics        Print the topic catalog and exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                saw_flag = true;
            }
            "--list-topics" => {
                saw_flag = true;
                if let Err(err) = list_topics() {
                    eprintln!("error: {err:?}");
                    std::process::exit(1);
                }
            }
            other if other.starts_with('-') => {
                eprintln!("error: unknown option {other}\nRun with --help for usage.");
                std::process::exit(2);
            }
            other => path = Some(other.to_string()),
        }
    }
    if saw_flag {
        CliAction::Exit
    } else {
        CliAction::Run(path)
    }
}

fn list_topics() -> anyhow::Result<()> {
    let cfg = config::load(config::LoadOptions::default())?;
    let catalog = Catalog::load(cfg.catalog.path.as_deref())?;
    for topic in catalog.list_topics() {
        println!("{}  {}", topic.title, Route::topic(topic.id.as_str()));
        for sub in &topic.subtopics {
            println!(
                "  {}  {}",
                sub.title,
                Route::subtopic(topic.id.as_str(), sub.id.as_str())
            );
        }
    }
    let stats = catalog.stats();
    println!("{} topics, {} subtopics", stats.topics, stats.subtopics);
    Ok(())
}
