/// language packs, read from disk on the blocking pool
use anyhow::Context;
use hashbrown::HashMap;
use std::path::Path;

use super::SegmentContext;
use crate::cache::LanguagePack;
use crate::error::SegmentError;

pub async fn load_language_packs(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let mut packs = HashMap::with_capacity(ctx.languages.len());
    let mut fair = ctx.fairness();

    for language in ctx.languages.iter() {
        let path = ctx.language_dir.join(format!("{}.json", language));
        let pack = ctx.pool.run(move || read_pack(&path)).await??;
        packs.insert(language.clone(), pack);
        fair.tick().await;
    }

    let count = packs.len();
    ctx.segments.languages.replace(packs).await;
    Ok(count)
}

fn read_pack(path: &Path) -> anyhow::Result<LanguagePack> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading language pack {}", path.display()))?;
    let mut pack: LanguagePack = serde_json::from_str(&text)
        .with_context(|| format!("parsing language pack {}", path.display()))?;

    for module in pack.values_mut() {
        for message in module.values_mut() {
            *message = bold_braces(message);
        }
    }

    Ok(pack)
}

/// wrap every `{placeholder}` in bold markers
pub fn bold_braces(text: &str) -> String {
    text.replace('{', "**{").replace('}', "}**")
}
