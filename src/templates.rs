//! Built-in prompt templates shown next to the gallery.

use crate::video::{GenerationMode, Resolution, VideoGenerationRequest};
use serde::Serialize;

/// Settings a template applies to the studio form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
    /// Length in seconds.
    pub duration: u32,
    /// Output resolution.
    pub quality: Resolution,
    /// Aspect ratio, e.g. `16:9`.
    pub aspect_ratio: &'static str,
    /// Whether audio is generated.
    pub generate_audio: bool,
}

/// A ready-made generation setup.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    /// Stable id.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Prompt filled into the form.
    pub prompt: &'static str,
    /// Generation mode.
    pub mode: GenerationMode,
    /// Model id.
    pub model: &'static str,
    /// Form settings.
    pub settings: TemplateSettings,
    /// Preview image path.
    pub thumbnail: &'static str,
    /// Category shown in the picker.
    pub category: &'static str,
}

impl Template {
    /// A request pre-filled from this template.
    pub fn to_request(&self) -> VideoGenerationRequest {
        VideoGenerationRequest::new(self.prompt)
            .with_mode(self.mode)
            .with_model(self.model)
            .with_duration(self.settings.duration)
            .with_resolution(self.settings.quality)
            .with_aspect_ratio(self.settings.aspect_ratio)
            .with_audio(self.settings.generate_audio)
    }
}

const fn settings(
    duration: u32,
    quality: Resolution,
    aspect_ratio: &'static str,
    generate_audio: bool,
) -> TemplateSettings {
    TemplateSettings {
        duration,
        quality,
        aspect_ratio,
        generate_audio,
    }
}

/// Recommended templates.
pub const TEMPLATES: &[Template] = &[
    Template {
        id: "tpl-1",
        title: "Cinematic Nature",
        description: "Stunning aerial shot of mountains with dramatic clouds",
        prompt: "Sweeping aerial shot over snow-capped mountains, golden hour sunlight, dramatic clouds rolling through valleys, cinematic camera movement, 4K quality",
        mode: GenerationMode::TextToVideo,
        model: "seedance-2.0",
        settings: settings(10, Resolution::P1080, "16:9", true),
        thumbnail: "🏔️",
        category: "Nature",
    },
    Template {
        id: "tpl-2",
        title: "Product Showcase",
        description: "Elegant product reveal with studio lighting",
        prompt: "Luxury product rotating on a reflective surface, soft studio lighting, shallow depth of field, premium feel, minimalist background, smooth 360-degree rotation",
        mode: GenerationMode::TextToVideo,
        model: "seedance-2.0",
        settings: settings(5, Resolution::P1080, "1:1", false),
        thumbnail: "💎",
        category: "Commercial",
    },
    Template {
        id: "tpl-3",
        title: "Urban Timelapse",
        description: "City skyline transitioning from day to night",
        prompt: "City skyline timelapse, day to night transition, lights turning on in buildings, car light trails on highways, clouds moving fast, dramatic sky colors at sunset",
        mode: GenerationMode::TextToVideo,
        model: "seedance-2.0",
        settings: settings(10, Resolution::P1080, "16:9", true),
        thumbnail: "🌆",
        category: "Urban",
    },
    Template {
        id: "tpl-4",
        title: "Character Animation",
        description: "Bring a character portrait to life with subtle movement",
        prompt: "The character slowly turns their head, wind blowing through their hair, subtle smile, eyes looking at camera, cinematic portrait lighting",
        mode: GenerationMode::ImageToVideo,
        model: "seedance-2.0",
        settings: settings(5, Resolution::P720, "9:16", false),
        thumbnail: "🎭",
        category: "Portrait",
    },
    Template {
        id: "tpl-5",
        title: "Food Commercial",
        description: "Appetizing food shot with steam and close-up details",
        prompt: "Close-up shot of freshly cooked food, steam rising, warm lighting, ingredients falling in slow motion, appetizing colors, restaurant commercial quality",
        mode: GenerationMode::TextToVideo,
        model: "seedance-2.0",
        settings: settings(5, Resolution::P1080, "1:1", true),
        thumbnail: "🍕",
        category: "Commercial",
    },
    Template {
        id: "tpl-6",
        title: "Scene Transition",
        description: "Smooth morphing transition between two scenes",
        prompt: "Smooth cinematic transition, camera pushing through clouds revealing a new landscape, seamless morphing effect, dramatic orchestral feeling",
        mode: GenerationMode::FirstLastFrame,
        model: "seedance-2.0",
        settings: settings(5, Resolution::P720, "16:9", true),
        thumbnail: "🎬",
        category: "Transition",
    },
];

/// "All" followed by each distinct category in template order.
pub fn categories() -> Vec<&'static str> {
    let mut out = vec!["All"];
    for t in TEMPLATES {
        if !out.contains(&t.category) {
            out.push(t.category);
        }
    }
    out
}

/// Templates in a category; "All" returns every template.
pub fn templates_in(category: &str) -> Vec<&'static Template> {
    TEMPLATES
        .iter()
        .filter(|t| category == "All" || t.category.eq_ignore_ascii_case(category))
        .collect()
}

/// Looks up a template by id.
pub fn find_template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}
