use dojo_viewer::{
    ViewerConfig,
    data_structures::texture::{SamplerOptions, clamp_anisotropy, mip_level_count},
};

#[test]
fn ground_anisotropy_never_exceeds_device_or_cap() {
    let cap = ViewerConfig::default().ground.max_anisotropy;
    assert_eq!(cap, 8);
    for device_max in [1, 2, 4, 8, 16] {
        let options = SamplerOptions::tiled(device_max, cap);
        assert_eq!(options.anisotropy, device_max.min(cap));
        assert_eq!(options.address_mode, wgpu::AddressMode::Repeat);
        assert_eq!(options.mipmap_filter, Some(wgpu::FilterMode::Linear));
    }
}

#[test]
fn anisotropy_is_at_least_one() {
    assert_eq!(clamp_anisotropy(0, 8), 1);
    assert_eq!(clamp_anisotropy(16, 0), 1);
}

#[test]
fn mip_chain_covers_the_larger_side() {
    assert_eq!(mip_level_count(1, 1), 1);
    assert_eq!(mip_level_count(1024, 512), 11);
    assert_eq!(mip_level_count(1000, 10), 10);
}
