use crate::domain::model::{FeatureCollection, RawRecord};
use crate::domain::ports::FeatureBuilder;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct Assembled {
    pub collection: FeatureCollection,
    pub skipped: usize,
}

/// Builds one feature per record, in input order. Skipped records leave no
/// gap; any other builder error aborts the whole assembly.
pub fn assemble<'a, I, B>(records: I, builder: &B, name: Option<String>) -> Result<Assembled>
where
    I: IntoIterator<Item = &'a RawRecord>,
    B: FeatureBuilder + ?Sized,
{
    let mut features = Vec::new();
    let mut skipped = 0;

    for (index, record) in records.into_iter().enumerate() {
        match builder.build(record) {
            Ok(feature) => features.push(feature),
            Err(e) if e.is_skippable() => {
                tracing::debug!("Row {} dropped: {}", index + 1, e);
                skipped += 1;
            }
            Err(e) => {
                tracing::error!("Row {} rejected: {}", index + 1, e);
                return Err(e);
            }
        }
    }

    Ok(Assembled {
        collection: FeatureCollection::new(name, features),
        skipped,
    })
}
