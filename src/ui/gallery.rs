/// Gallery page: archive statistics above the image grid
use iced::widget::image as image_widget;
use iced::widget::{column, container, scrollable, text, Column, Row, Space};
use iced::{Element, Length};

use crate::archive::{ArchiveStats, GalleryCell, GalleryLayout};
use crate::Message;

/// Edge length of a grid cell in logical pixels
const CELL_SIZE: f32 = 240.0;

/// Everything the gallery page shows, loaded off the UI thread
#[derive(Debug, Clone)]
pub struct GalleryData {
    pub layout: GalleryLayout,
    pub stats: ArchiveStats,
}

fn cell_view(cell: &GalleryCell) -> Element<'_, Message> {
    match cell {
        GalleryCell::Image {
            image_path,
            caption,
        } => column![
            image_widget(image_widget::Handle::from_path(image_path))
                .width(Length::Fixed(CELL_SIZE))
                .height(Length::Fixed(CELL_SIZE)),
            text(caption).size(12),
        ]
        .spacing(4)
        .width(Length::Fixed(CELL_SIZE))
        .into(),
        // Keep the slot so later cells stay in their columns
        GalleryCell::Blank => container(Space::new(
            Length::Fixed(CELL_SIZE),
            Length::Fixed(CELL_SIZE),
        ))
        .style(container::bordered_box)
        .into(),
        GalleryCell::Hidden => {
            Space::new(Length::Fixed(CELL_SIZE), Length::Fixed(CELL_SIZE)).into()
        }
    }
}

fn stats_view(stats: &ArchiveStats) -> Element<'_, Message> {
    let join = |items: &std::collections::BTreeSet<String>| {
        items.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    column![
        text(format!("Total images: {}", stats.total_images)).size(18),
        text(format!("Devices used: {}", join(&stats.devices_used))),
        text(format!("Model versions: {}", join(&stats.model_versions))),
        text(format!(
            "Generation dates: {}",
            stats.generation_dates.join(", ")
        )),
    ]
    .spacing(4)
    .into()
}

pub fn view(data: &GalleryData) -> Element<'_, Message> {
    if data.layout.cells.is_empty() {
        return column![stats_view(&data.stats), text("No generated images yet.")]
            .spacing(20)
            .into();
    }

    let grid = Column::with_children(data.layout.row_iter().map(|cells| {
        Row::with_children(cells.iter().map(cell_view))
            .spacing(12)
            .into()
    }))
    .spacing(16);

    column![stats_view(&data.stats), scrollable(grid).height(Length::Fill)]
        .spacing(20)
        .into()
}
