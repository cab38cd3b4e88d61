use crate::errors::*;
use crate::resolver::Resolver;
use crate::tagfile::{Pin, TagFile};
use crate::values::{self, Lookup};
use serde_yaml::Mapping;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub updates: usize,
    pub total: usize,
}

/// Resolve every image reference of the tag file against the merged values.
///
/// Charts and image references are processed in tag file order. Lookup misses
/// are logged and skipped, the first resolver failure aborts the pass and
/// leaves the references resolved so far pinned in `tags`.
pub async fn update(
    tags: &mut TagFile,
    values: &Mapping,
    resolver: &dyn Resolver,
) -> Result<Summary> {
    let mut summary = Summary::default();

    let charts = tags.charts().map(String::from).collect::<Vec<_>>();
    for chart in charts {
        let Lookup::Found(images) = values::get_mapping(values, &chart) else {
            warn!("Settings for chart {chart} were not found in provided values");
            continue;
        };

        for image_ref in tags.image_refs(&chart)? {
            summary.total += 1;

            let Lookup::Found(image) = values::get_mapping(images, &image_ref) else {
                warn!("An image value was not found for {chart}.{image_ref}");
                continue;
            };
            let Lookup::Found(repository) = values::get_str(image, "repository") else {
                warn!("An image repository value was not found for {chart}.{image_ref}");
                continue;
            };
            let image_name = repository.rsplit('/').next().unwrap_or(repository);
            let Lookup::Found(tag) = values::get_tag(image, "tag") else {
                warn!("An image tag value was not found for {chart}.{image_ref}");
                continue;
            };

            info!("Updating hash digest for tag {tag} of {chart} image {image_name}");
            summary.updates += 1;
            let digest = resolver
                .resolve(repository, &tag, image_name)
                .await
                .with_context(|| anyhow!("Failed to resolve {repository}:{tag}"))?;
            debug!("Resolved {repository}:{tag} to {digest}");

            tags.pin(
                &chart,
                &image_ref,
                Pin::new(repository, &digest.algorithm, &digest.hash),
            )?;
        }
    }

    info!("{} of {} image tags updated", summary.updates, summary.total);
    Ok(summary)
}
