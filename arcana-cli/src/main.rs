//! arcana - Command-line client for the Arcana tarot reading service

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libarcana::profile::Theme;
use libarcana::service::ArcanaService;
use libarcana::{ArcanaError, Config, Reading};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "arcana")]
#[command(version)]
#[command(about = "Consult AI tarot readers from the terminal")]
#[command(long_about = "\
arcana - Consult AI tarot readers from the terminal

COMMANDS:
    readers     List readers, reading types and today's quote
    reading     Ask a reader for a reading
    shop        List coin packages
    buy         Buy a coin package
    quiz        Take the five-question tarot quiz
    cards       Browse or search the card library
    profile     Show balance, level and achievements
    history     Show past readings and quizzes
    settings    Change sound, animation and theme preferences

USAGE EXAMPLES:
    arcana readers
    arcana reading --reader luna --type three_card --question \"What lies ahead?\"
    arcana buy seeker
    arcana quiz --answers c,b,d,a,b
    arcana cards hope
    arcana profile --format json

CONFIGURATION:
    Configuration file: ~/.config/arcana/config.toml
    Profile location:   ~/.local/share/arcana/currentUser.json

    Override with environment variables:
        ARCANA_CONFIG        - Path to config file
        ARCANA_SERVICE_URL   - Base URL of the reading service
        ARCANA_LOG_LEVEL     - Log filter (default: warn)
        ARCANA_LOG_FORMAT    - text, json or pretty

EXIT CODES:
    0 - Success
    1 - Configuration or storage error
    2 - Reading service unavailable or rejected the request
    3 - Invalid input or action not possible right now
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true, env = "ARCANA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List readers, reading types and the daily quote
    Readers,

    /// Ask a reader for a reading
    Reading {
        /// Reader id
        #[arg(short, long)]
        reader: String,

        /// Reading type key (e.g. three_card)
        #[arg(short = 't', long = "type")]
        reading_type: String,

        /// Question for the cards
        #[arg(short, long, default_value = "")]
        question: String,
    },

    /// List coin packages
    Shop,

    /// Buy a coin package
    Buy {
        /// Package id
        package: String,
    },

    /// Take the quiz
    Quiz {
        /// Comma-separated choices in question order (letters or 1-based numbers)
        #[arg(short, long, value_delimiter = ',')]
        answers: Option<Vec<String>>,
    },

    /// Browse or search the card library
    Cards {
        /// Matches card names and keywords; omit for the first page
        query: Option<String>,
    },

    /// Show the profile
    Profile,

    /// Show reading and quiz history
    History,

    /// Change preferences
    Settings {
        /// Toggle sound
        #[arg(long)]
        sound: bool,

        /// Toggle animations
        #[arg(long)]
        animations: bool,

        /// Theme: mystical, dark or light
        #[arg(long)]
        theme: Option<Theme>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libarcana::logging::init_default(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<ArcanaError>()
            .map(ArcanaError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = match cli.format.as_str() {
        "text" => Format::Text,
        "json" => Format::Json,
        other => {
            return Err(ArcanaError::InvalidInput(format!(
                "Invalid format '{}'. Must be 'text' or 'json'",
                other
            ))
            .into())
        }
    };

    let config = Config::load_from(cli.config.as_deref())?;
    let mut service = ArcanaService::from_config(&config)?;

    let result = dispatch(&mut service, cli.command, format).await;
    print_notifications(&service);
    result
}

async fn dispatch(service: &mut ArcanaService, command: Commands, format: Format) -> Result<()> {
    match command {
        Commands::Readers => {
            start(service).await?;
            cmd_readers(service, format)
        }
        Commands::Reading {
            reader,
            reading_type,
            question,
        } => {
            start(service).await?;
            cmd_reading(service, &reader, &reading_type, question, format).await
        }
        Commands::Shop => {
            start(service).await?;
            cmd_shop(service, format)
        }
        Commands::Buy { package } => {
            start(service).await?;
            cmd_buy(service, &package, format).await
        }
        Commands::Quiz { answers } => {
            start(service).await?;
            cmd_quiz(service, answers, format).await
        }
        Commands::Cards { query } => {
            start(service).await?;
            cmd_cards(service, query.as_deref().unwrap_or(""), format)
        }
        Commands::Profile => cmd_profile(service, format),
        Commands::History => cmd_history(service, format),
        Commands::Settings {
            sound,
            animations,
            theme,
        } => cmd_settings(service, sound, animations, theme, format),
    }
}

async fn start(service: &mut ArcanaService) -> Result<()> {
    service
        .start()
        .await
        .context("failed to load the mystical library")
}

fn cmd_readers(service: &ArcanaService, format: Format) -> Result<()> {
    let catalog = service.catalog();
    if format == Format::Json {
        return print_json(&serde_json::json!({
            "readers": catalog.readers,
            "reading_types": catalog.reading_types,
            "quote": catalog.quote,
        }));
    }

    println!("\"{}\"\n", catalog.quote);
    println!("Readers:");
    for reader in &catalog.readers {
        println!(
            "  {} | {} | {} | {}",
            reader.id, reader.name, reader.specialty, reader.accuracy
        );
    }
    println!("\nReading types:");
    for (key, reading_type) in &catalog.reading_types {
        println!(
            "  {} | {} | {} coins",
            key, reading_type.name, reading_type.cost
        );
    }
    Ok(())
}

async fn cmd_reading(
    service: &mut ArcanaService,
    reader: &str,
    reading_type: &str,
    question: String,
    format: Format,
) -> Result<()> {
    service.select_reader(reader)?;
    service.select_reading_type(reading_type)?;
    service.set_question(question);

    let reading = service.perform_reading().await?;
    if format == Format::Json {
        return print_json(&reading);
    }

    print_reading(&reading);
    println!("\nBalance: {} coins", service.profile().balance);
    Ok(())
}

fn print_reading(reading: &Reading) {
    println!("Reader: {} ({})", reading.reader.name, reading.reader.specialty);
    if !reading.question.is_empty() {
        println!("Question: {}", reading.question);
    }
    println!();
    for drawn in &reading.cards {
        let orientation = if drawn.reversed { " (reversed)" } else { "" };
        println!("  [{}] {}{}", drawn.position, drawn.card.name, orientation);
    }
    println!("\n{}", reading.interpretation.summary);
    for card in &reading.interpretation.cards {
        println!(
            "  {} - {}: {} ({})",
            card.position,
            card.card_name,
            card.interpretation,
            card.keywords.join(", ")
        );
    }
}

fn cmd_shop(service: &ArcanaService, format: Format) -> Result<()> {
    let packages = &service.catalog().coin_packages;
    if format == Format::Json {
        return print_json(packages);
    }

    println!("Balance: {} coins\n", service.profile().balance);
    for package in packages {
        let bonus = if package.bonus > 0 {
            format!(" (+{} bonus)", package.bonus)
        } else {
            String::new()
        };
        println!(
            "  {} | {} coins{} | {:.2}",
            package.id, package.coins, bonus, package.price
        );
    }
    Ok(())
}

async fn cmd_buy(service: &mut ArcanaService, package: &str, format: Format) -> Result<()> {
    let receipt = service.purchase_coins(package).await?;
    if format == Format::Json {
        return print_json(&receipt);
    }

    println!(
        "Added {} coins. Balance: {} coins",
        receipt.coins_added, receipt.new_balance
    );
    Ok(())
}

async fn cmd_quiz(
    service: &mut ArcanaService,
    answers: Option<Vec<String>>,
    format: Format,
) -> Result<()> {
    let questions = service.start_quiz()?.questions().to_vec();

    let choices = match answers {
        Some(given) => {
            if given.len() != questions.len() {
                return Err(ArcanaError::InvalidInput(format!(
                    "Expected {} answers, got {}",
                    questions.len(),
                    given.len()
                ))
                .into());
            }
            given
                .iter()
                .map(|choice| parse_choice(choice))
                .collect::<Result<Vec<_>>>()?
        }
        None => prompt_answers(&questions)?,
    };

    for (question, option) in questions.iter().zip(choices) {
        service.answer_question(question.id, option)?;
    }

    let outcome = service.submit_quiz().await?;
    if format == Format::Json {
        return print_json(&outcome);
    }

    for (question, answer) in questions.iter().zip(&outcome.answers) {
        let mark = if answer.correct { "correct" } else { "wrong" };
        println!("  {} - {}", question.question, mark);
    }
    println!(
        "\nScore: {}/{} ({:.1}%)",
        outcome.score.score, outcome.score.total, outcome.score.percentage
    );
    println!(
        "Earned {} coins and {} XP. Balance: {} coins",
        outcome.score.coins_earned, outcome.reward.experience, outcome.score.new_balance
    );
    Ok(())
}

/// Accept `a`..`z` or a 1-based option number
fn parse_choice(choice: &str) -> Result<usize> {
    let choice = choice.trim().to_lowercase();
    let mut chars = choice.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_lowercase() {
            return Ok(usize::from(letter as u8 - b'a'));
        }
    }

    match choice.parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number - 1),
        _ => Err(ArcanaError::InvalidInput(format!("Invalid answer '{}'", choice)).into()),
    }
}

fn prompt_answers(questions: &[libarcana::types::QuizQuestion]) -> Result<Vec<usize>> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut choices = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        println!("{}. {}", index + 1, question.question);
        for (option_index, option) in question.options.iter().enumerate() {
            println!(
                "   {}) {}",
                libarcana::types::QuizQuestion::option_label(option_index),
                option
            );
        }
        print!("> ");
        std::io::stdout().flush().context("Failed to write prompt")?;

        let line = lines
            .next()
            .ok_or_else(|| ArcanaError::InvalidInput("No answer provided".to_string()))?
            .context("Failed to read answer from stdin")?;
        choices.push(parse_choice(&line)?);
    }

    Ok(choices)
}

fn cmd_cards(service: &mut ArcanaService, query: &str, format: Format) -> Result<()> {
    let cards = service.search_cards(query).to_vec();
    if format == Format::Json {
        return print_json(&cards);
    }

    for card in &cards {
        println!(
            "  {} | {} | {}",
            card.name,
            card.suit,
            card.upright.keywords.join(", ")
        );
    }
    Ok(())
}

fn cmd_profile(service: &ArcanaService, format: Format) -> Result<()> {
    let profile = service.profile();
    let stats = profile.stats();

    if format == Format::Json {
        return print_json(&serde_json::json!({
            "id": profile.id,
            "balance": profile.balance,
            "level": profile.level,
            "experience": profile.experience,
            "experience_to_next_level": profile.experience_to_next_level(),
            "achievements": profile.achievements,
            "preferences": profile.preferences,
            "stats": stats,
        }));
    }

    println!("Profile:  {}", profile.id);
    println!("Balance:  {} coins", profile.balance);
    println!(
        "Level:    {} ({} XP, {} to next level)",
        profile.level,
        profile.experience,
        profile.experience_to_next_level()
    );
    println!(
        "Readings: {}  Quizzes: {}  Achievements: {}",
        stats.readings, stats.quizzes, stats.achievements
    );
    for achievement in &profile.achievements {
        println!("  * {} - {}", achievement.title(), achievement.description());
    }
    Ok(())
}

fn cmd_history(service: &ArcanaService, format: Format) -> Result<()> {
    let profile = service.profile();
    if format == Format::Json {
        return print_json(&serde_json::json!({
            "readings": profile.reading_history,
            "quizzes": profile.quiz_history,
        }));
    }

    for reading in &profile.reading_history {
        let when = reading
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let cards: Vec<&str> = reading.cards.iter().map(|c| c.card.name.as_str()).collect();
        println!(
            "{} | {} | {} coins | {}",
            when,
            reading.reader.name,
            reading.cost,
            cards.join(", ")
        );
    }
    for quiz in &profile.quiz_history {
        println!(
            "{} | quiz | {}/{} ({:.1}%) | +{} XP",
            quiz.timestamp.format("%Y-%m-%d %H:%M"),
            quiz.score,
            quiz.total,
            quiz.percentage,
            quiz.experience_earned
        );
    }
    Ok(())
}

fn cmd_settings(
    service: &mut ArcanaService,
    sound: bool,
    animations: bool,
    theme: Option<Theme>,
    format: Format,
) -> Result<()> {
    if sound {
        service.toggle_sound();
    }
    if animations {
        service.toggle_animations();
    }
    if let Some(theme) = theme {
        service.set_theme(theme);
    }

    let preferences = &service.profile().preferences;
    if format == Format::Json {
        return print_json(preferences);
    }

    println!("Sound:      {}", on_off(preferences.sound_enabled));
    println!("Animations: {}", on_off(preferences.animations_enabled));
    println!("Theme:      {}", preferences.theme);
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Notifications go to stderr so stdout stays parseable
fn print_notifications(service: &ArcanaService) {
    for notification in service.notifications().snapshot() {
        eprintln!("[{}] {}", notification.severity, notification.message);
    }
}
