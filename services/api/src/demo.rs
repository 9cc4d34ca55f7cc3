use crate::infra::{load_wardrobe, parse_filter_mode};
use clap::Args;
use outfit_ai::error::AppError;
use outfit_ai::guardrails::{GuardrailMonitor, MonitorConfig};
use outfit_ai::healing::{
    GenerationRequest, GenerationResponse, OutfitGenerationService, SnapshotStore,
};
use outfit_ai::styling::rules::{FilterMode, StylingRules};
use outfit_ai::wardrobe::domain::{ClothingItem, ItemId, UserId, Weather};
use outfit_ai::wardrobe::import::WardrobeImporter;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_WARDROBE: &str = include_str!("../../../crates/outfit-ai/sample_wardrobe.csv");
const CLI_OWNER: &str = "cli";

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Wardrobe export to choose from (CSV, or a JSON array of items)
    #[arg(long)]
    pub(crate) wardrobe: PathBuf,
    /// Occasion to dress for, e.g. "business" or "date night"
    #[arg(long)]
    pub(crate) occasion: String,
    /// Forecast temperature in Fahrenheit
    #[arg(long, default_value_t = 68.0, allow_negative_numbers = true)]
    pub(crate) temperature: f32,
    /// Forecast condition, e.g. "rain" or "sunny"
    #[arg(long, default_value = "clear")]
    pub(crate) condition: String,
    /// Probability of precipitation between 0 and 1
    #[arg(long, default_value_t = 0.0)]
    pub(crate) precipitation: f32,
    #[arg(long, default_value = "")]
    pub(crate) style: String,
    #[arg(long, default_value = "")]
    pub(crate) mood: String,
    /// Item id that must stay in consideration (repeatable)
    #[arg(long = "pin")]
    pub(crate) pinned: Vec<String>,
    /// Number of alternative outfits to include
    #[arg(long, default_value_t = 0)]
    pub(crate) variations: usize,
    /// Candidate matching strategy: semantic or traditional
    #[arg(long, value_parser = parse_filter_mode)]
    pub(crate) filter_mode: Option<FilterMode>,
    /// Styling rules file overriding the built-in tables
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Include the filtering trail in the output
    #[arg(long)]
    pub(crate) debug: bool,
    /// Print the raw JSON response instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Wardrobe export to use instead of the bundled sample wardrobe
    #[arg(long)]
    pub(crate) wardrobe: Option<PathBuf>,
    /// Alternatives to generate per scenario
    #[arg(long, default_value_t = 1)]
    pub(crate) variations: usize,
}

pub(crate) async fn run_generate(args: GenerateArgs) -> Result<(), AppError> {
    let owner = UserId(CLI_OWNER.to_string());
    let wardrobe = load_wardrobe(&args.wardrobe, &owner)?;
    let rules = match &args.rules {
        Some(path) => StylingRules::load(path)?,
        None => StylingRules::default(),
    };
    let service = inline_service(rules);

    let request = GenerationRequest {
        occasion: args.occasion,
        style: args.style,
        mood: args.mood,
        weather: Weather {
            temperature_f: args.temperature,
            condition: args.condition,
            precipitation: args.precipitation,
        },
        wardrobe: Some(wardrobe),
        pinned_items: args.pinned.into_iter().map(ItemId).collect(),
        variations: args.variations,
        filter_mode: args.filter_mode,
        debug: args.debug,
        ..GenerationRequest::default()
    };
    let title = format!(
        "{} at {:.0}°F ({})",
        request.occasion, request.weather.temperature_f, request.weather.condition
    );

    let response = service.generate(request).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        render_generation(&title, &response);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let owner = UserId(CLI_OWNER.to_string());
    let wardrobe = match &args.wardrobe {
        Some(path) => load_wardrobe(path, &owner)?,
        None => WardrobeImporter::from_reader(SAMPLE_WARDROBE.as_bytes(), &owner)?,
    };
    let service = inline_service(StylingRules::default());

    println!("Outfit generation demo");
    println!("Wardrobe: {} items", wardrobe.len());

    for (occasion, temperature_f, condition) in demo_scenarios() {
        let request = scenario_request(occasion, temperature_f, condition, &wardrobe, args.variations);
        let title = format!("{occasion} at {temperature_f:.0}°F ({condition})");
        let response = service.generate(request).await?;
        println!();
        render_generation(&title, &response);
    }

    let status = service.monitor().status();
    println!("\nGuardrails");
    println!(
        "- {} generations recorded, pass rate {:.1}%, composition success {:.1}%",
        status.total_recorded,
        status.recent.pass_rate * 100.0,
        status.recent.composition_success_rate * 100.0
    );
    let reasons = service.monitor().debug_reasons(3);
    for share in reasons.reasons {
        println!(
            "- {}: {} rejections ({:.1}%)",
            share.reason, share.count, share.percentage
        );
    }

    Ok(())
}

fn inline_service(rules: StylingRules) -> OutfitGenerationService<SnapshotStore> {
    let monitor = Arc::new(GuardrailMonitor::new(MonitorConfig::default()));
    OutfitGenerationService::new(Arc::new(SnapshotStore::default()), Arc::new(rules), monitor)
}

fn demo_scenarios() -> [(&'static str, f32, &'static str); 4] {
    [
        ("business", 90.0, "sunny"),
        ("casual", 35.0, "snow"),
        ("athletic", 75.0, "clear"),
        ("date night", 58.0, "rain"),
    ]
}

fn scenario_request(
    occasion: &str,
    temperature_f: f32,
    condition: &str,
    wardrobe: &[ClothingItem],
    variations: usize,
) -> GenerationRequest {
    GenerationRequest {
        occasion: occasion.to_string(),
        weather: Weather {
            temperature_f,
            condition: condition.to_string(),
            precipitation: 0.0,
        },
        wardrobe: Some(wardrobe.to_vec()),
        variations,
        ..GenerationRequest::default()
    }
}

pub(crate) fn render_generation(title: &str, response: &GenerationResponse) {
    let metadata = &response.metadata;
    println!("Outfit for {title}");
    println!(
        "Strategy: {} | valid: {} | severity: {} | score: {:.2} | confidence: {:.2}",
        metadata.generation_strategy.label(),
        metadata.is_valid,
        metadata.severity.label(),
        metadata.outfit_score,
        metadata.confidence
    );

    for item in &response.items {
        println!(
            "- [{}] {} ({})",
            item.category().label(),
            item.name,
            item.formality().label()
        );
    }

    for error in &response.errors {
        println!("! {error}");
    }
    for warning in &response.warnings {
        println!("~ {warning}");
    }

    if response.healing.tiers.len() > 1 {
        println!("Healing trail ({} validation runs)", response.healing.validation_runs);
        for tier in &response.healing.tiers {
            let outcome = if tier.accepted { "accepted" } else { "rejected" };
            match &tier.note {
                Some(note) => println!("  {} {outcome}: {note}", tier.tier.label()),
                None => println!(
                    "  {} {outcome}, {} remaining errors",
                    tier.tier.label(),
                    tier.remaining_errors.len()
                ),
            }
        }
    }

    for (index, variation) in response.variations.iter().enumerate() {
        let names: Vec<&str> = variation.items.iter().map(|item| item.name.as_str()).collect();
        println!(
            "Variation {}: {} (score {:.2})",
            index + 1,
            names.join(", "),
            variation.outfit_score
        );
    }

    if let Some(debug) = &response.debug {
        println!(
            "Debug: {}/{} candidates eligible",
            debug.candidates_eligible, debug.candidates_considered
        );
        for rejection in &debug.rejections {
            println!("  {} rejected: {}", rejection.item_id, rejection.reason.label());
        }
    }
}
