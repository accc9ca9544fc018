use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::MissedTickBehavior;
use trainer_core::achievements::{self, Badge};
use trainer_core::history::{self, SessionLabel, Trend};
use trainer_core::media::{self, MediaEmbed, Platform};
use trainer_core::prefs::FilePreferences;
use trainer_core::timer::TimerMode;
use trainer_core::*;

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Guided workouts, history and weight tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// bcrypt cost for new passwords
    #[arg(long, global = true, hide = true, env = "TRAINER_HASH_COST",
          value_parser = clap::value_parser!(u32).range(4..=31))]
    hash_cost: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup(Credentials),

    /// Sign in to an existing account
    Login(Credentials),

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Load the built-in workouts into the local store
    Seed,

    /// List available workouts
    Workouts,

    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Walk through a workout and record the session
    Run {
        /// Workout id (see `trainer workouts`)
        workout_id: String,

        /// Auto-complete (for testing) - skip prompts and record immediately
        #[arg(long)]
        auto_complete: bool,

        /// Record this many seconds instead of the measured time
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Show completed workouts
    History {
        /// Sort order; remembered for next time
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Write the history as CSV to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Delete all of your workout history
        #[arg(long, requires = "yes")]
        reset: bool,

        /// Confirm a destructive action
        #[arg(long)]
        yes: bool,
    },

    /// Track body weight
    Weight {
        #[command(subcommand)]
        action: WeightCommand,
    },

    /// Workout advice for a body weight in kg
    Advice {
        #[arg(allow_negative_numbers = true)]
        weight: f64,
    },

    /// Show earned badges
    Achievements,
}

#[derive(clap::Args)]
struct Credentials {
    #[arg(long)]
    email: String,

    #[arg(long, env = "TRAINER_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        /// Weight in kg
        #[arg(long, allow_negative_numbers = true)]
        weight: f64,
    },
}

#[derive(Subcommand)]
enum WeightCommand {
    /// List measurements, oldest first
    List,
    /// Record a measurement in kg
    Add {
        #[arg(allow_negative_numbers = true)]
        kg: f64,
    },
    /// Correct a measurement
    Edit {
        id: String,
        #[arg(allow_negative_numbers = true)]
        kg: f64,
    },
    /// Delete a measurement
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Date,
    Duration,
}

impl From<SortArg> for HistorySort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => HistorySort::CompletedAt,
            SortArg::Duration => HistorySort::Duration,
        }
    }
}

/// Everything a command needs, opened once per invocation
struct App {
    config: Config,
    data_dir: PathBuf,
    gateway: Arc<FileGateway>,
    auth: LocalIdentityProvider,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data.data_dir.clone());
        std::fs::create_dir_all(&data_dir)?;

        let mut auth = LocalIdentityProvider::open(&data_dir)?;
        if let Some(cost) = cli.hash_cost {
            auth = auth.with_hash_cost(cost);
        }

        tracing::debug!("Using data directory {:?}", data_dir);
        Ok(Self {
            gateway: Arc::new(FileGateway::new(data_dir.join("store.json"))),
            config,
            data_dir,
            auth,
        })
    }

    fn identity(&self) -> Result<Identity> {
        self.auth.current().ok_or(Error::NoIdentity)
    }

    fn prefs(&self) -> FilePreferences {
        FilePreferences::new(self.data_dir.join("prefs.json"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        trainer_core::logging::init_with_level("debug");
    } else {
        trainer_core::logging::init();
    }

    let app = App::open(&cli)?;

    match cli.command {
        Commands::Signup(creds) => cmd_signup(&app, &creds).await,
        Commands::Login(creds) => cmd_login(&app, &creds).await,
        Commands::Logout => {
            app.auth.sign_out().await?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => {
            match app.auth.current() {
                Some(identity) => println!("{} ({})", identity.email, identity.user_id),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Commands::Seed => {
            let count = catalog::seed(&app.gateway, catalog::get_default_catalog()).await?;
            println!("✓ Seeded {} workouts", count);
            Ok(())
        }
        Commands::Workouts => cmd_workouts(&app).await,
        Commands::Profile { action } => cmd_profile(&app, action).await,
        Commands::Run {
            workout_id,
            auto_complete,
            duration,
        } => cmd_run(&app, &workout_id, auto_complete, duration).await,
        Commands::History {
            sort,
            export,
            reset,
            yes: _,
        } => cmd_history(&app, sort, export.as_deref(), reset).await,
        Commands::Weight { action } => cmd_weight(&app, action).await,
        Commands::Advice { weight } => cmd_advice(&app, weight).await,
        Commands::Achievements => cmd_achievements(&app).await,
    }
}

async fn cmd_signup(app: &App, creds: &Credentials) -> Result<()> {
    let identity = app.auth.sign_up(&creds.email, &creds.password).await?;
    println!("✓ Account created for {}", identity.email);
    println!("  Complete your profile with `trainer profile set`.");
    Ok(())
}

async fn cmd_login(app: &App, creds: &Credentials) -> Result<()> {
    let identity = app.auth.sign_in(&creds.email, &creds.password).await?;
    println!("✓ Signed in as {}", identity.email);
    if profile::needs_profile(&app.gateway, &identity.user_id).await? {
        println!("  Your profile is incomplete. Run `trainer profile set`.");
    }
    Ok(())
}

async fn cmd_workouts(app: &App) -> Result<()> {
    let workouts = catalog::list_workouts(&app.gateway).await?;
    if workouts.is_empty() {
        println!("No workouts available. Run `trainer seed` to load the built-in set.");
        return Ok(());
    }

    for workout in workouts {
        println!(
            "{:<20} {:<20} {:>3} min {:>4} kcal  {}",
            workout.id,
            workout.title,
            workout.duration,
            workout.calories,
            workout.kind.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn cmd_profile(app: &App, action: ProfileCommand) -> Result<()> {
    let identity = app.identity()?;
    match action {
        ProfileCommand::Show => match profile::load_profile(&app.gateway, &identity.user_id).await? {
            Some(p) => {
                println!("Name:   {}", p.name);
                println!("Age:    {}", p.age);
                println!("Weight: {} kg", p.weight);
            }
            None => println!("No profile yet. Run `trainer profile set`."),
        },
        ProfileCommand::Set { name, age, weight } => {
            let profile = Profile {
                id: identity.user_id,
                name,
                age,
                weight,
            };
            profile::save_profile(&app.gateway, &profile).await?;
            println!("✓ Profile saved");
        }
    }
    Ok(())
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn cmd_run(
    app: &App,
    workout_id: &str,
    auto_complete: bool,
    duration: Option<u64>,
) -> Result<()> {
    app.identity()?;

    let options = SessionOptions::from(&app.config.session);
    let mut session = WorkoutSession::new(
        app.gateway.clone(),
        SystemClock,
        feedback::cue_for(&app.config.feedback),
        app.auth.subscribe(),
        options,
    );
    session.load_workout(workout_id).await?;

    if let Some(workout) = session.workout() {
        display_workout_header(workout, session.steps().len());
    }

    let embed = media::embed_for(Platform::Terminal);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Step phase
    while let Some(step) = session.current_step() {
        let index = step.step_number;
        display_step(step, session.steps().len(), embed.as_ref());

        let input = if auto_complete {
            String::new()
        } else {
            prompt(&mut lines, "Enter: next   b: back   q: quit").await?
        };

        let movement = match input.as_str() {
            "q" => StepMove::Exited,
            "b" => session.retreat_step()?,
            _ => session.advance_step()?,
        };
        match movement {
            StepMove::Exited => {
                println!("\nLeft the workout at step {}. Nothing was recorded.", index);
                return Ok(());
            }
            StepMove::EnteredTimer => break,
            StepMove::Moved { .. } => {}
        }
    }

    // Timer phase
    let elapsed = if auto_complete {
        session.finish_timer()?.unwrap_or(0)
    } else {
        run_timer(&mut session, &mut lines, app.config.session.tick_interval()).await?
    };

    let recorded = duration.unwrap_or(elapsed);
    match session.complete_session(recorded).await? {
        Completion::Recorded(summary) => {
            println!();
            println!("✓ Workout complete: {}", summary.workout_title);
            println!("  Session time: {}", clock_face(summary.duration_seconds));
            println!("  Time on steps: {}", clock_face(summary.engagement_seconds));
            println!("  Session logged!");
        }
        Completion::AlreadyRecorded => println!("Session was already recorded."),
    }
    Ok(())
}

async fn run_timer<G, C>(
    session: &mut WorkoutSession<G, C>,
    lines: &mut StdinLines,
    tick: std::time::Duration,
) -> Result<u64>
where
    G: DataGateway,
    C: Clock,
{
    let hint = match session.timer().mode() {
        TimerMode::CountUp => "Enter: finish   p: pause/resume   Ctrl-C: finish",
        TimerMode::CountDown { .. } => "Enter: finish early   p: pause/resume   Ctrl-C: finish",
    };
    println!("\n{}", hint);

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let tick = session.tick()?;
                print!("\r  ⏱  {}   ", clock_face(tick.display_seconds));
                std::io::stdout().flush()?;
                if tick.completed {
                    println!();
                    return Ok(tick.elapsed_seconds);
                }
            }
            line = lines.next_line() => {
                match line?.as_deref().map(str::trim) {
                    Some("p") => match session.toggle_pause()? {
                        PauseToggle::Paused => println!("\n  Paused"),
                        PauseToggle::Resumed => {}
                        PauseToggle::Completed => return finish(session),
                    },
                    _ => return finish(session),
                }
            }
            _ = tokio::signal::ctrl_c() => return finish(session),
        }
    }
}

fn finish<G: DataGateway, C: Clock>(session: &mut WorkoutSession<G, C>) -> Result<u64> {
    let elapsed = match session.finish_timer()? {
        Some(elapsed) => elapsed,
        None => session.timer().elapsed_seconds(Utc::now()),
    };
    println!();
    Ok(elapsed)
}

async fn cmd_history(
    app: &App,
    sort: Option<SortArg>,
    export: Option<&Path>,
    reset: bool,
) -> Result<()> {
    let identity = app.identity()?;

    if reset {
        let deleted = history::reset_history(&app.gateway, &identity.user_id).await?;
        println!("✓ Deleted {} history entries", deleted);
        return Ok(());
    }

    let mut prefs = app.prefs();
    let sort = match sort {
        Some(arg) => {
            let sort = HistorySort::from(arg);
            sort.store(&mut prefs)?;
            sort
        }
        None => HistorySort::load(&prefs),
    };

    let rows = history::load_history(&app.gateway, &identity.user_id, sort).await?;

    if let Some(path) = export {
        history::write_export(&rows, path)?;
        println!("✓ Exported {} entries to {}", rows.len(), path.display());
        return Ok(());
    }

    if rows.is_empty() {
        println!("No workouts completed yet.");
        return Ok(());
    }

    for (i, row) in rows.iter().enumerate() {
        let prev = rows.get(i + 1);
        display_history_row(row, prev);
    }
    Ok(())
}

async fn cmd_weight(app: &App, action: WeightCommand) -> Result<()> {
    let identity = app.identity()?;
    let user = &identity.user_id;

    match action {
        WeightCommand::List => {
            let entries = weight::list_weights(&app.gateway, user).await?;
            if entries.is_empty() {
                println!("No weights recorded yet.");
                return Ok(());
            }
            for entry in &entries {
                println!(
                    "{}  {:>6.1} kg  {}",
                    entry.recorded_at.format("%Y-%m-%d %H:%M"),
                    entry.weight,
                    entry.id
                );
            }
            if let Some(delta) = weight::weight_delta(&entries) {
                println!("\nChange since last: {:+.1} kg", delta);
            }
        }
        WeightCommand::Add { kg } => {
            let advice = weight::save_weight(&app.gateway, user, kg, None).await?;
            println!("✓ Recorded {:.1} kg", kg);
            println!("  {}", advice.message);
            show_recommendation(app, &advice).await?;
        }
        WeightCommand::Edit { id, kg } => {
            let advice = weight::save_weight(&app.gateway, user, kg, Some(&id)).await?;
            println!("✓ Updated entry to {:.1} kg", kg);
            println!("  {}", advice.message);
            show_recommendation(app, &advice).await?;
        }
        WeightCommand::Delete { id } => {
            weight::delete_weight(&app.gateway, user, &id).await?;
            println!("✓ Deleted entry {}", id);
        }
    }
    Ok(())
}

async fn cmd_advice(app: &App, weight: f64) -> Result<()> {
    let advice = advise(weight).ok_or_else(|| {
        Error::InvalidInput(format!("weight must be a positive number, got {}", weight))
    })?;
    println!("{}", advice.message);
    show_recommendation(app, &advice).await
}

/// Point at the seeded workout matching the advice, if there is one
async fn show_recommendation(app: &App, advice: &Advice) -> Result<()> {
    match advice::find_recommended_workout(&app.gateway, advice).await {
        Ok(workout) => println!("Recommended: {} (`trainer run {}`)", workout.title, workout.id),
        Err(e) if e.is_not_found() => {
            tracing::debug!("No recommended workout in store: {}", e);
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

async fn cmd_achievements(app: &App) -> Result<()> {
    let identity = app.identity()?;
    let rows = history::load_history(&app.gateway, &identity.user_id, HistorySort::CompletedAt).await?;
    let earned = achievements::earned(&rows);

    for badge in Badge::ALL {
        let mark = if earned.contains(&badge) { "✓" } else { " " };
        println!("[{}] {:<14} {}", mark, badge.title(), badge.description());
    }
    Ok(())
}

async fn prompt(lines: &mut StdinLines, hint: &str) -> Result<String> {
    println!("─────────────────────────────────────────");
    println!("{}", hint);
    print!("> ");
    std::io::stdout().flush()?;

    // EOF quits
    Ok(match lines.next_line().await? {
        Some(line) => line.trim().to_lowercase(),
        None => "q".to_string(),
    })
}

fn display_workout_header(workout: &Workout, steps: usize) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", workout.title.to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    if !workout.description.is_empty() {
        println!("  {}", workout.description);
    }
    println!(
        "  {} min · {} kcal · {} steps",
        workout.duration, workout.calories, steps
    );
}

fn display_step(step: &WorkoutStep, total: usize, embed: &dyn MediaEmbed) {
    println!();
    println!("  Step {}/{}: {}", step.step_number, total, step.name);
    if let Some(description) = &step.description {
        println!("  {}", description);
    }
    if let Some(seconds) = step.duration {
        println!("  → {} seconds", seconds);
    }
    if let Some(reps) = step.reps {
        println!("  → {} reps", reps);
    }
    println!("  {}", media::render_step_video(step, embed));
}

fn display_history_row(row: &HistoryRow, prev: Option<&HistoryRow>) {
    let workout = row.workout.as_ref();
    let calories = workout.map(|w| w.calories);
    let prev_calories = prev.and_then(|p| p.workout.as_ref()).map(|w| w.calories);
    let prev_duration = prev.and_then(|p| p.entry.duration_seconds);

    println!(
        "{}",
        workout.map(|w| w.title.as_str()).unwrap_or("Untitled Workout")
    );
    if let Some(w) = workout {
        println!("  Plan: {} min", w.duration);
    }
    println!(
        "  Calories: {} kcal {}",
        calories.map(|c| c.to_string()).unwrap_or_else(|| "--".into()),
        trend_mark(history::trend(calories, prev_calories))
    );
    println!(
        "  Session: {} min {}",
        row.session_minutes()
            .map(|m| format!("{:.1}", m))
            .unwrap_or_else(|| "--".into()),
        trend_mark(history::trend(row.entry.duration_seconds, prev_duration))
    );
    let label = match history::session_label(row) {
        SessionLabel::Intense => "Intense",
        SessionLabel::Short => "Short",
        SessionLabel::NotLogged => "Not logged properly",
    };
    println!("  {}", label);
    println!(
        "  Completed: {}",
        row.entry.completed_at.format("%Y-%m-%d %H:%M")
    );
}

fn trend_mark(trend: Option<Trend>) -> &'static str {
    match trend {
        Some(Trend::Up) => "▲",
        Some(Trend::Down) => "▼",
        Some(Trend::Same) => "=",
        None => "",
    }
}

fn clock_face(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
