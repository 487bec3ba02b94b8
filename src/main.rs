use clap::Parser;
use iced::widget::{button, column, container, horizontal_rule, row, text, text_editor};
use iced::{Element, Length, Task, Theme};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod archive;
mod cli;
mod config;
mod error;
mod generator;
mod output;
mod pipeline;
mod state;
mod ui;

use cli::{Cli, Command};
use config::AppConfig;
use generator::Generator;
use output::Published;
use state::GenerationParams;
use ui::form::{Form, Outcome};
use ui::gallery::GalleryData;

/// Loaded generator shared with background tasks
///
/// The pipeline is loaded once and reused for every generation. Only one
/// generation runs at a time; the mutex is never contended in practice.
#[derive(Clone)]
pub struct SharedGenerator(Arc<Mutex<Generator>>);

impl std::fmt::Debug for SharedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedGenerator")
    }
}

/// Pipeline loading state
enum Engine {
    Loading,
    Ready(SharedGenerator),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Generate,
    Gallery,
}

/// Main application state
struct Studio {
    config: AppConfig,
    engine: Engine,
    page: Page,
    form: Form,
    /// A generation is running
    busy: bool,
    outcome: Option<Outcome>,
    gallery: Option<GalleryData>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Background pipeline load finished
    EngineLoaded(Result<SharedGenerator, String>),
    PromptEdited(text_editor::Action),
    StepsChanged(u32),
    GuidanceChanged(f64),
    UseSeedToggled(bool),
    SeedChanged(String),
    /// User clicked "Generate Image"
    Generate,
    /// Background generation finished
    GenerationComplete(Result<Published, String>),
    ShowGenerate,
    ShowGallery,
    /// Background archive scan finished
    GalleryLoaded(Result<GalleryData, String>),
}

impl Studio {
    /// Create the application and start loading the pipeline
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let status = format!("Loading {}...", config.model_id);
        let load = Task::perform(load_generator_async(config.clone()), Message::EngineLoaded);

        (
            Studio {
                config,
                engine: Engine::Loading,
                page: Page::Generate,
                form: Form::default(),
                busy: false,
                outcome: None,
                gallery: None,
                status,
            },
            load,
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::EngineLoaded(Ok(generator)) => {
                let (model_id, device) = match generator.0.lock() {
                    Ok(g) => (g.model_id().to_string(), g.device_name().to_string()),
                    Err(_) => (self.config.model_id.clone(), "unknown".to_string()),
                };
                self.status = format!("Ready. {} on {}.", model_id, device);
                self.engine = Engine::Ready(generator);
                Task::none()
            }
            Message::EngineLoaded(Err(e)) => {
                error!("Pipeline load failed: {}", e);
                self.status = format!("❌ Failed to load model: {}", e);
                self.engine = Engine::Failed;
                Task::none()
            }
            Message::PromptEdited(action) => {
                self.form.prompt.perform(action);
                Task::none()
            }
            Message::StepsChanged(steps) => {
                self.form.steps = steps;
                Task::none()
            }
            Message::GuidanceChanged(guidance) => {
                self.form.guidance_scale = guidance;
                Task::none()
            }
            Message::UseSeedToggled(enabled) => {
                self.form.use_seed = enabled;
                Task::none()
            }
            Message::SeedChanged(seed) => {
                self.form.seed_text = seed;
                Task::none()
            }
            Message::Generate => {
                let Engine::Ready(generator) = &self.engine else {
                    return Task::none();
                };
                if self.busy {
                    return Task::none();
                }

                let params = match self.form.params() {
                    Ok(params) => params,
                    Err(e) => {
                        self.status = format!("⚠️  {}", e);
                        return Task::none();
                    }
                };

                self.busy = true;
                self.status = "Generating image...".to_string();

                Task::perform(
                    generate_async(generator.clone(), params),
                    Message::GenerationComplete,
                )
            }
            Message::GenerationComplete(result) => {
                self.busy = false;
                match result {
                    Ok(published) => {
                        self.status = "✅ Image generated.".to_string();
                        self.outcome = Some(Outcome {
                            prompt: published.record.prompt.clone(),
                            published,
                        });
                        // Gallery is stale now
                        self.gallery = None;
                    }
                    Err(e) => {
                        error!("Generation failed: {}", e);
                        self.status = format!("❌ Generation failed: {}", e);
                    }
                }
                Task::none()
            }
            Message::ShowGenerate => {
                self.page = Page::Generate;
                Task::none()
            }
            Message::ShowGallery => {
                self.page = Page::Gallery;
                self.status = "Loading gallery...".to_string();
                Task::perform(
                    load_gallery_async(self.config.clone()),
                    Message::GalleryLoaded,
                )
            }
            Message::GalleryLoaded(Ok(data)) => {
                self.status = format!("{} images in archive.", data.stats.total_images);
                self.gallery = Some(data);
                Task::none()
            }
            Message::GalleryLoaded(Err(e)) => {
                error!("Gallery load failed: {}", e);
                self.status = format!("❌ Failed to read archive: {}", e);
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let nav = row![
            button("Generate")
                .on_press(Message::ShowGenerate)
                .padding(8),
            button("Gallery")
                .on_press(Message::ShowGallery)
                .padding(8),
        ]
        .spacing(10);

        let page: Element<Message> = match self.page {
            Page::Generate => ui::form::view(
                &self.form,
                self.busy,
                matches!(self.engine, Engine::Ready(_)),
                self.outcome.as_ref(),
            ),
            Page::Gallery => match &self.gallery {
                Some(data) => ui::gallery::view(data),
                None => text("Loading gallery...").into(),
            },
        };

        let content = column![
            text("Image Generator").size(36),
            nav,
            horizontal_rule(1),
            page,
            horizontal_rule(1),
            text(&self.status).size(14),
        ]
        .spacing(16)
        .padding(30);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Load the pipeline in a background thread
async fn load_generator_async(config: AppConfig) -> Result<SharedGenerator, String> {
    tokio::task::spawn_blocking(move || {
        Generator::load(&config)
            .map(|g| SharedGenerator(Arc::new(Mutex::new(g))))
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
}

/// Generate and save one image in a background thread
async fn generate_async(
    generator: SharedGenerator,
    params: GenerationParams,
) -> Result<Published, String> {
    tokio::task::spawn_blocking(move || {
        let mut generator = generator
            .0
            .lock()
            .map_err(|_| "generator lock poisoned".to_string())?;
        generator
            .generate_and_persist(&params)
            .map(|(_, published)| published)
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
}

/// Read the archive and lay it out in a background thread
async fn load_gallery_async(config: AppConfig) -> Result<GalleryData, String> {
    tokio::task::spawn_blocking(move || {
        let records = archive::load_metadata(&config.metadata_dir).map_err(|e| e.to_string())?;
        Ok(GalleryData {
            stats: archive::ArchiveStats::from_records(&records),
            layout: archive::render_gallery(&records, config.gallery_columns),
        })
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
}

fn run_ui(config: AppConfig) -> iced::Result {
    iced::application("Image Generator", Studio::update, Studio::view)
        .theme(Studio::theme)
        .centered()
        .run_with(move || Studio::new(config))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    info!(
        "Images in {}, metadata in {}",
        config.images_dir.display(),
        config.metadata_dir.display()
    );

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => run_ui(config)?,
        Command::Generate {
            prompt,
            steps,
            guidance_scale,
            seed,
        } => {
            let params = GenerationParams {
                steps,
                guidance_scale,
                ..GenerationParams::new(prompt)
            }
            .with_seed(seed);
            cli::run_generate(&config, params)?
        }
        Command::Gallery {
            output,
            columns,
            tile_size,
        } => cli::run_gallery(&config, output, columns, tile_size)?,
        Command::Stats { json } => cli::run_stats(&config, json)?,
        Command::Reconcile => cli::run_reconcile(&config)?,
        Command::InitConfig => cli::run_init_config(&config, cli.config.as_deref())?,
    }

    Ok(())
}
