//! Composes the single instruction sent to the generative backend, and
//! post-processes its reply.

use crate::{
    config::Config,
    model::{WardrobeItem, WeatherSnapshot},
    rotation::RotationConstraints,
};

const ELLIPSIS: &str = "...";

/// Everything the instruction is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub weather: &'a WeatherSnapshot,
    pub wardrobe: &'a [WardrobeItem],
    pub constraints: &'a RotationConstraints,
    pub skill: Option<&'a str>,
}

fn wardrobe_listing(wardrobe: &[WardrobeItem]) -> String {
    wardrobe
        .iter()
        .map(|item| {
            format!(
                "- {} ({}, {}): {}",
                item.name,
                item.category,
                item.pillar.as_deref().unwrap_or("N/A"),
                item.description.as_deref().unwrap_or("N/A"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn recent_outfits_block(constraints: &RotationConstraints, lookback_days: u32) -> String {
    if constraints.is_empty() {
        return String::new();
    }

    let excluded = if constraints.excluded_tops.is_empty() {
        "None - all tops available".to_string()
    } else {
        constraints.excluded_tops.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    let bottoms = if constraints.recent_bottoms.is_empty() {
        "None".to_string()
    } else {
        constraints.recent_bottoms.keys().cloned().collect::<Vec<_>>().join(", ")
    };

    let or_na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };
    let listing = constraints
        .recent
        .iter()
        .map(|h| format!("- {}: Top={}, Bottom={}", h.date, or_na(&h.top), or_na(&h.bottom)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\n<recent_outfits>\n\
         RULES:\n\
         - DO NOT recommend these tops (already worn their max times in the last {lookback_days} days): {excluded}\n\
         - Try to vary bottoms (recently worn): {bottoms}\n\
         \n\
         Full history (last {lookback_days} days):\n\
         {listing}\n\
         </recent_outfits>"
    )
}

fn weather_block(location: &str, w: &WeatherSnapshot) -> String {
    format!(
        "<weather>\n\
         Location: {location}\n\
         Date: {date}\n\
         Local time: {time}\n\
         Current temperature: {temp}°C (feels like {feels}°C)\n\
         Today's high: {high}°C\n\
         Today's low: {low}°C\n\
         Conditions: {cond}\n\
         Humidity: {hum}%\n\
         Wind: {wind} km/h\n\
         Rain chance: {rain}% (current), {daily_rain}% (today)\n\
         UV index: {uv}\n\
         </weather>",
        date = w.date_formatted,
        time = w.local_time,
        temp = w.temperature_c,
        feels = w.feels_like_c,
        high = w.high_c,
        low = w.low_c,
        cond = w.condition,
        hum = w.humidity_pct,
        wind = w.wind_speed_kmh,
        rain = w.rain_chance_pct,
        daily_rain = w.daily_rain_chance_pct,
        uv = w.uv_index,
    )
}

/// Build the instruction for today's recommendation.
pub fn compose(config: &Config, inputs: PromptInputs<'_>) -> String {
    let location = &config.location.name;
    let name = &config.recipient_name;
    let date = &inputs.weather.date_formatted;
    let rules = &config.weather_rules;

    let mut out = String::new();
    out.push_str(
        "You are helping me decide what to wear today. Style: ametora (Japanese Americana) - \
         natural materials, muted tones, relaxed fit, pieces that age well.\n\n",
    );

    if let Some(skill) = inputs.skill {
        out.push_str(&format!("<skill>\n{skill}\n</skill>\n\n"));
    }

    out.push_str(&weather_block(location, inputs.weather));
    out.push_str(&format!(
        "\n\n<wardrobe>\n{}\n</wardrobe>\n",
        wardrobe_listing(inputs.wardrobe)
    ));
    out.push_str(&recent_outfits_block(
        inputs.constraints,
        config.history.lookback_days,
    ));

    let greeting = format!(
        "Good morning {name}, it is {date} in {location}.\n\
         The weather today is [today's high]°C, [humidity]% humidity, [conditions]."
    );

    out.push_str(&format!(
        "\n\
Give me today's outfit recommendation. Keep under {target} characters for SMS. Use line breaks for readability.

IMPORTANT: Use the exact date from the weather data above (Date: {date}).

Format (use actual line breaks):
{greeting}

[Brief explanation of outfit choice based on weather + styling tip]

Top: [item]
Bottom: [item]
Shoes: [item]
Outer: [item only if needed]
Accessory: [item if appropriate]

REQUIRED: Always include Top, Bottom, and Shoes with their labels. Outer and Accessory are optional; leave the line out when not needed.

LAYERING OPTION: In mild weather ({lay_min}-{lay_max}°C), you can recommend a white tee as an underlayer with an unbuttoned shirt. Format as \"Top: [tee] + [shirt] (unbuttoned)\"

CRITICAL: You MUST NOT recommend any top that appears in the \"DO NOT recommend\" list above. Pick a different top from the wardrobe.

COLOR COORDINATION RULES:
- NEVER pair the same shade of color for top and bottom (e.g., light blue shirt + light blue wash jeans is bad)
- Different shades of the same color family are OK (e.g., chambray + indigo denim works - light blue + dark blue)
- Create tonal contrast: light top + dark bottom OR dark top + light bottom

WEATHER RULES:
- Outer layer: Only include if temp < {outer}°C
- Rain > {rain}%: Prefer boots over canvas shoes
- UV ≥ {uv}: Suggest a cap/hat

Use actual item names from my wardrobe. Plain text only, no markdown.",
        target = config.sms.target_chars,
        lay_min = rules.layering_temp_min_c,
        lay_max = rules.layering_temp_max_c,
        outer = rules.outer_layer_temp_c,
        rain = rules.rain_threshold_pct,
        uv = rules.uv_threshold,
    ));

    out
}

/// Cap a reply at `max_chars` characters, ending in "..." when cut.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = message.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
