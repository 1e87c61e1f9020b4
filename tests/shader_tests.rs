//! Validates the crate's WGSL source with naga before any GPU sees it.

use plume::PARTICLE_SHADER;

fn parse(source: &str) -> naga::Module {
    naga::front::wgsl::parse_str(source).expect("shader should parse")
}

#[test]
fn particle_shader_parses_and_validates() {
    let module = parse(PARTICLE_SHADER);

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .expect("shader should validate");
}

#[test]
fn particle_shader_declares_both_entry_points() {
    let module = parse(PARTICLE_SHADER);
    let names: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
    assert!(names.contains(&"vs_main"));
    assert!(names.contains(&"fs_main"));
}
