use mri_enhance::network::{enhancement_unet, EnhancementNet, UnetSpec};
use mri_enhance::{Error, Tensor};

fn small_net(seed: u64) -> EnhancementNet {
    EnhancementNet::new(UnetSpec::new(10, 10, 3, 3).with_seed(seed)).unwrap()
}

fn ramp_field(h: usize, w: usize) -> Tensor {
    let data = (0..h * w * 2).map(|i| ((i * 37) % 11) as f64 / 11.0 - 0.4).collect();
    Tensor::from_data(h, w, 2, data)
}

#[test]
fn shapes_for_dimensions_that_pool_cleanly() {
    let net = enhancement_unet(256, 256, 0, 0).unwrap();
    assert_eq!(net.input_shapes(), [(256, 256, 2), (256, 256, 1)]);
    assert_eq!(net.output_shape(), (256, 256, 1));

    let net = enhancement_unet(218, 170, 3, 3).unwrap();
    assert_eq!(net.input_shapes(), [(218, 170, 2), (218, 170, 1)]);
    assert_eq!(net.output_shape(), (218, 170, 1));
}

#[test]
fn construction_fails_when_padded_size_is_not_a_multiple_of_eight() {
    for (h, w, hpad, wpad) in [(256, 256, 3, 3), (100, 96, 0, 0), (96, 98, 0, 0), (218, 170, 2, 3)] {
        let err = enhancement_unet(h, w, hpad, wpad).unwrap_err();
        assert!(
            matches!(err, Error::IndivisibleDimension { divisor: 8, .. }),
            "{h}x{w} pad ({hpad}, {wpad}) gave {err}"
        );
    }
}

#[test]
fn untrained_network_on_zero_input_returns_the_reference() {
    // Zero input and zero biases keep every activation at zero.
    let net = small_net(1);
    let field = Tensor::zeros(10, 10, 2);
    let reference = Tensor::filled(10, 10, 1, 5.0);
    let out = net.forward(&field, &reference).unwrap();
    assert_eq!(out.shape(), (10, 10, 1));
    assert!(out.data.iter().all(|&v| v == 5.0));
}

#[test]
fn output_is_reference_plus_a_reference_independent_correction() {
    let net = small_net(2);
    let field = ramp_field(10, 10);
    let with_five = net.forward(&field, &Tensor::filled(10, 10, 1, 5.0)).unwrap();
    let with_zero = net.forward(&field, &Tensor::zeros(10, 10, 1)).unwrap();
    for (a, b) in with_five.data.iter().zip(&with_zero.data) {
        assert!((a - b - 5.0).abs() < 1e-9);
    }
    assert!(with_zero.data.iter().any(|&v| v != 0.0), "correction should be non-trivial");
}

#[test]
fn zeroed_projection_leaves_the_reference_untouched() {
    let mut net = small_net(3);
    net.unet.head.weights.iter_mut().for_each(|w| *w = 0.0);
    let reference = Tensor::from_data(10, 10, 1, (0..100).map(f64::from).collect());
    let out = net.forward(&ramp_field(10, 10), &reference).unwrap();
    assert_eq!(out, reference);
}

#[test]
fn saved_model_reloads_with_identical_outputs() {
    let spec = UnetSpec {
        level_channels: vec![4, 6, 8, 10],
        convs_per_level: 2,
        ..UnetSpec::new(10, 10, 3, 3)
    }
    .with_seed(4);
    let net = EnhancementNet::new(spec).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    net.save_json(path.to_str().unwrap()).unwrap();
    let loaded = EnhancementNet::load_json(path.to_str().unwrap()).unwrap();

    let field = ramp_field(10, 10);
    let reference = Tensor::filled(10, 10, 1, 1.0);
    assert_eq!(
        net.forward(&field, &reference).unwrap(),
        loaded.forward(&field, &reference).unwrap()
    );
}

#[test]
fn spec_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spec.json");
    let spec = UnetSpec::new(218, 170, 3, 3).with_seed(9);
    spec.save_json(path.to_str().unwrap()).unwrap();
    assert_eq!(UnetSpec::load_json(path.to_str().unwrap()).unwrap(), spec);
}

fn saved_small_net(dir: &std::path::Path) -> (std::path::PathBuf, serde_json::Value) {
    let path = dir.join("model.json");
    small_net(6).save_json(path.to_str().unwrap()).unwrap();
    let json = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    (path, json)
}

fn rewrite(path: &std::path::Path, json: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string(json).unwrap()).unwrap();
}

#[test]
fn model_with_truncated_weights_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let (path, mut json) = saved_small_net(dir.path());
    json["unet"]["head"]["weights"] = serde_json::json!([0.5]);
    rewrite(&path, &json);

    let err = EnhancementNet::load_json(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::InvalidSpec(_)), "got {err}");
}

#[test]
fn model_whose_layers_disagree_with_its_spec_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let (path, json) = saved_small_net(dir.path());

    let mut kernel = json.clone();
    kernel["spec"]["kernel"] = serde_json::json!(5);
    rewrite(&path, &kernel);
    assert!(matches!(
        EnhancementNet::load_json(path.to_str().unwrap()),
        Err(Error::InvalidSpec(_))
    ));

    let mut widths = json;
    widths["spec"]["level_channels"] = serde_json::json!([48, 64, 128, 512]);
    rewrite(&path, &widths);
    assert!(matches!(
        EnhancementNet::load_json(path.to_str().unwrap()),
        Err(Error::InvalidSpec(_))
    ));
}
