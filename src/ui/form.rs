/// Generation form
/// Prompt entry, sampling sliders and the optional seed
use iced::widget::image as image_widget;
use iced::widget::{button, checkbox, column, row, slider, text, text_editor, text_input, Column};
use iced::{Color, Element, Length};

use crate::output::Published;
use crate::state::params::{
    GenerationParams, DEFAULT_PROMPT, DEFAULT_SEED, GUIDANCE_RANGE, STEPS_RANGE,
};
use crate::Message;

const SUCCESS: Color = Color::from_rgb(0.35, 0.8, 0.45);

/// Current values of the form widgets
pub struct Form {
    /// Multi-line prompt buffer
    pub prompt: text_editor::Content,
    pub steps: u32,
    pub guidance_scale: f64,
    pub use_seed: bool,
    /// Raw text of the seed field; parsed on submit
    pub seed_text: String,
}

impl Default for Form {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            prompt: text_editor::Content::with_text(DEFAULT_PROMPT),
            steps: params.steps,
            guidance_scale: params.guidance_scale,
            use_seed: false,
            seed_text: DEFAULT_SEED.to_string(),
        }
    }
}

impl Form {
    /// Prompt text without the trailing newline the editor keeps
    pub fn prompt_text(&self) -> String {
        self.prompt.text().trim_end_matches('\n').to_string()
    }

    /// Build validated parameters from the widget values
    pub fn params(&self) -> Result<GenerationParams, String> {
        let seed = if self.use_seed {
            let seed = self.seed_text.trim().parse::<u64>().map_err(|_| {
                format!(
                    "Seed must be a non-negative integer, got {:?}",
                    self.seed_text
                )
            })?;
            Some(seed)
        } else {
            None
        };

        let params = GenerationParams {
            prompt: self.prompt_text(),
            steps: self.steps,
            guidance_scale: self.guidance_scale,
            seed,
        };
        params.validate().map_err(|e| e.to_string())?;
        Ok(params)
    }
}

/// Result of the last successful generation
#[derive(Debug, Clone)]
pub struct Outcome {
    pub prompt: String,
    pub published: Published,
}

pub fn view<'a>(
    form: &'a Form,
    busy: bool,
    ready: bool,
    outcome: Option<&'a Outcome>,
) -> Element<'a, Message> {
    let seed_row = form.use_seed.then(|| {
        row![
            text("Enter seed value:"),
            text_input("42", &form.seed_text)
                .on_input(Message::SeedChanged)
                .width(Length::Fixed(200.0)),
        ]
        .spacing(10)
    });

    let generate = if busy {
        button(text("Generating image..."))
    } else {
        button(text("Generate Image")).on_press_maybe(ready.then_some(Message::Generate))
    };

    let mut content: Column<Message> = column![
        text("Enter your prompt:"),
        text_editor(&form.prompt)
            .placeholder("Describe the image")
            .on_action(Message::PromptEdited)
            .height(Length::Fixed(100.0))
            .padding(10),
        text(format!("Number of inference steps: {}", form.steps)),
        slider(STEPS_RANGE, form.steps, Message::StepsChanged),
        text(format!("Guidance scale: {:.1}", form.guidance_scale)),
        slider(
            GUIDANCE_RANGE,
            form.guidance_scale,
            Message::GuidanceChanged
        )
        .step(0.1),
        checkbox("Use custom seed", form.use_seed).on_toggle(Message::UseSeedToggled),
    ]
    .spacing(12)
    .push_maybe(seed_row)
    .push(generate.padding(10));

    if let Some(outcome) = outcome {
        let image_path = &outcome.published.image_path;
        content = content
            .push(
                image_widget(image_widget::Handle::from_path(image_path))
                    .width(Length::Fixed(512.0)),
            )
            .push(text(format!("Generated image: {}", outcome.prompt)).size(14))
            .push(text(format!("Image saved to: {}", image_path.display())).color(SUCCESS))
            .push(
                text(format!(
                    "Metadata saved to: {}",
                    outcome.published.metadata_path.display()
                ))
                .color(SUCCESS),
            );
    }

    content.into()
}
