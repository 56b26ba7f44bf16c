use component_identifier::{AssetSource, Catalog, DirAssets, LabelSet};

#[test]
fn bundled_catalog_describes_every_bundled_label() {
    let assets = DirAssets::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"));
    let labels = LabelSet::load(&assets, "labels.txt").unwrap();
    let catalog = Catalog::parse(&assets.open_to_string("component_info.json").unwrap()).unwrap();

    for label in labels.iter() {
        let metadata = catalog
            .find(label)
            .unwrap_or_else(|| panic!("no catalog entry for {label}"));
        assert!(!metadata.description.is_empty());
        assert!(!metadata.specs.is_empty());
    }
}
