use anyhow::Context;
use clap::Parser;
use log::{debug, info};

use ivtcdn::action::Action;
use ivtcdn::cli::{Args, Command};
use ivtcdn::cycle;
use ivtcdn::project::Project;
use ivtcdn::scene;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| "ivtcdn.log".into());
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("failed to create log file {}", log_path.display()))?;
        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    debug!("Command-line args: {:?}", args);
    run(args.command)
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::New {
            script,
            fields,
            output,
        } => {
            let mut project = Project::create_new(&script, fields);
            project
                .save_as(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Created {} ({} fields, {} frames)",
                output.display(),
                fields,
                cycle::frame_count_for_fields(fields)
            );
        }

        Command::Info { project } => {
            let p = load(&project)?;
            let annotations = &p.annotations;
            println!("project:        {}", project.display());
            println!("script:         {}", p.script_file.display());
            println!("schema version: {}", p.version());
            println!("fields:         {}", annotations.field_count());
            println!("frames:         {}", annotations.frame_count());
            println!(
                "cycles:         {}",
                cycle::max_cycle(annotations.field_count()) + 1
            );
            println!("active cycle:   {}", p.settings.active_cycle);
            let markers: Vec<String> = annotations
                .scene_changes()
                .iter()
                .map(|i| i.to_string())
                .collect();
            println!("scene changes:  [{}]", markers.join(", "));
            println!("no-match:       {}", annotations.no_match_handling().len());
            println!("attributes:     {}", annotations.extra_attributes().len());
        }

        Command::Dump { project } => {
            let p = load(&project)?;
            let text = serde_json::to_string_pretty(&p.to_document())?;
            println!("{}", text);
        }

        Command::Migrate { project } => {
            let mut p = load(&project)?;
            p.save().with_context(|| "failed to rewrite project")?;
            println!("{} is at schema version {}", project.display(), p.version());
        }

        Command::Propagate { project, cycle } => {
            let mut p = load(&project)?;
            let active = cycle.unwrap_or(p.settings.active_cycle);
            let bounds = scene::apply_cycle_to_scene(&mut p.annotations, active);
            p.save()?;
            println!(
                "Propagated cycle {} across fields {}..{}",
                active, bounds.start, bounds.end
            );
        }

        Command::SetAction {
            project,
            field,
            action,
        } => {
            let parsed: Action = action
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let mut p = load(&project)?;
            p.annotations.set_action(field, parsed)?;
            p.save()?;
            println!("field {} -> {}", field, parsed);
        }

        Command::SetNote {
            project,
            field,
            note,
        } => {
            let mut p = load(&project)?;
            p.annotations.set_note(field, note.clone())?;
            p.save()?;
            println!("field {} note -> {:?}", field, note);
        }

        Command::ToggleScene { project, field } => {
            let mut p = load(&project)?;
            let marked = p.annotations.toggle_scene_change(field)?;
            p.save()?;
            println!(
                "field {} scene change {}",
                field,
                if marked { "set" } else { "cleared" }
            );
        }

        Command::ToggleNoMatch { project, frame } => {
            let mut p = load(&project)?;
            let set = if p.annotations.has_no_match_override(frame) {
                p.annotations.clear_no_match_override(frame)?;
                false
            } else {
                p.annotations.set_no_match_override(frame)?;
                true
            };
            p.save()?;
            println!(
                "frame {} no-match override {}",
                frame,
                if set { "set" } else { "cleared" }
            );
        }

        Command::SetAttribute {
            project,
            frame,
            text,
        } => {
            let mut p = load(&project)?;
            p.annotations.set_extra_attribute(frame, text.clone())?;
            p.save()?;
            if text.trim().is_empty() {
                println!("frame {} attribute cleared", frame);
            } else {
                println!("frame {} attribute -> {:?}", frame, text);
            }
        }
    }
    Ok(())
}

fn load(path: &std::path::Path) -> anyhow::Result<Project> {
    Project::load(path).with_context(|| format!("failed to open {}", path.display()))
}
