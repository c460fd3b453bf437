use ndarray::{array, Array1, Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use st_memory::{
    ControllerState, ControllerWeights, Linear, LstmCell, MemoryBank, MemoryConfig,
    MemoryController,
};

fn scalar_tracking_controller() -> MemoryController {
    let config = MemoryConfig::new(1, 1, 1, 1).with_controller_units(2);
    let inputs = config.head_input_dim();
    let mut rng = StdRng::seed_from_u64(5);
    let mut add = Array2::<f32>::zeros((inputs, 1));
    add[[0, 0]] = 1.0;
    let weights = ControllerWeights {
        write_key: Linear::glorot(inputs, 1, &mut rng),
        write_erase: Linear::from_parts(Array2::zeros((inputs, 1)), array![20.0]).unwrap(),
        write_add: Linear::from_parts(add, Array1::zeros(1)).unwrap(),
        write_strength: None,
        read_key: Linear::glorot(inputs, 1, &mut rng),
        read_strength: None,
        lstm: LstmCell::new(1, 2, &mut rng),
    };
    MemoryController::with_weights(config, weights).unwrap()
}

#[test]
fn one_row_bank_tracks_the_latest_write() {
    let controller = scalar_tracking_controller();
    let mut state = ControllerState::zeros(controller.config());
    for value in [0.5f32, -1.25, 2.0, 0.75] {
        state = controller.step(&state, array![value].view()).unwrap();
        assert_eq!(state.write_weights, array![[1.0]]);
        assert_eq!(state.read_weights, array![[1.0]]);
        assert!((state.bank.content()[[0, 0]] - value).abs() < 1e-6);
        assert!((state.prev_read[0] - value).abs() < 1e-6);
    }
}

#[test]
fn final_output_is_the_last_lstm_hidden_state() {
    let controller = scalar_tracking_controller();
    let sequence = array![[0.5], [-1.25], [2.0], [0.75]];
    let state = controller.run_sequence(sequence.view()).unwrap();
    let batch = Array3::from_shape_fn((2, 4, 1), |(_, t, _)| sequence[[t, 0]]);
    let out = controller.forward(batch.view()).unwrap();
    assert_eq!(out.row(0), state.prev_output);
    assert_eq!(out.row(1), state.prev_output);
}

#[test]
fn written_keys_win_later_lookups() {
    let mut bank = MemoryBank::zeros(4, 3, 1e-6);
    let keys = [
        array![[1.0, 0.0, 0.0]],
        array![[0.0, 1.0, 0.0]],
        array![[0.0, 0.0, 1.0]],
    ];
    for (row, key) in keys.iter().enumerate() {
        let mut weights = Array2::<f32>::zeros((1, 4));
        weights[[0, row]] = 1.0;
        bank = bank
            .write(weights.view(), weights.view(), Array2::<f32>::ones((1, 3)).view(), key.view())
            .unwrap();
    }
    for (row, key) in keys.iter().enumerate() {
        let weights = bank.address(key.view()).unwrap();
        let best = weights
            .row(0)
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &w)| if w > acc.1 { (i, w) } else { acc });
        assert_eq!(best.0, row);
    }
}

#[test]
fn long_sequences_stay_finite() {
    let mut config = MemoryConfig::new(4, 3, 8, 6).with_seed(99);
    config.sharpen_keys = true;
    config.condition_on_prior_weights = true;
    let controller = MemoryController::new(config).unwrap();
    let sequence = Array2::from_shape_fn((64, 4), |(t, f)| if f == 0 { 1e3 } else { (t * f) as f32 });
    let state = controller.run_sequence(sequence.view()).unwrap();
    assert!(state.bank.content().iter().all(|v| v.is_finite()));
    assert!(state.prev_output.iter().all(|v| v.is_finite()));
    for row in state.read_weights.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-5);
    }
}
