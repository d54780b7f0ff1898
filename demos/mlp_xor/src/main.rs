// MLP XOR Example — Training the 3-layer network on XOR
//
// XOR is the classic problem that shows why a hidden layer is needed: no
// single linear boundary separates (0,1),(1,0) from (0,0),(1,1).
//
// Architecture: Input(2) → Hidden(4, sigmoid) → Output(1, sigmoid)
//
// This example demonstrates:
//   0. Installing the accelerator (GPU with `--features cuda`, host otherwise)
//   1. Building a Network from a NetworkConfig
//   2. Training with train_batch and watching the loss history
//   3. Predicting, then saving and restoring the trained network
//
// Usage:
//   cargo run --release -p example-mlp-xor
//   RUST_LOG=debug cargo run --release -p example-mlp-xor
//   cargo run --release -p example-mlp-xor --features cuda

use synapse::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> synapse::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Synapse — MLP XOR Example ===");
    println!();

    // 0. Compute device
    let accel = init_accelerator();
    println!("Accelerator: {}", accel.name());
    println!();

    // 1. Training data
    let data: Vec<Example> = vec![
        (vec![0.0, 0.0], vec![0.0]).into(),
        (vec![0.0, 1.0], vec![1.0]).into(),
        (vec![1.0, 0.0], vec![1.0]).into(),
        (vec![1.0, 1.0], vec![0.0]).into(),
    ];

    // 2. Network
    let config = NetworkConfig::new(2, 4, 1)
        .with_learning_rate(0.5)
        .with_seed(7);
    let mut net = Network::new(config)?;
    println!(
        "Network: {} → {} ({}) → {} ({}), lr = {}",
        net.config().input_nodes,
        net.config().hidden_nodes,
        net.config().hidden_activation,
        net.config().output_nodes,
        net.config().output_activation,
        net.learning_rate()
    );
    println!();

    // 3. Train
    let epochs = 2000;
    println!("Training for {epochs} epochs...");
    println!("{:-<50}", "");
    let history = net.train_batch(&data, epochs)?;
    for (epoch, loss) in history.iter().enumerate() {
        if epoch % 200 == 0 || epoch == epochs - 1 {
            println!("  Epoch {:>4} | Loss: {:.6}", epoch, loss);
        }
    }
    println!("{:-<50}", "");
    println!();

    // 4. Evaluate
    println!("Predictions after training:");
    for ex in &data {
        let pred = net.predict(&ex.input)?[0];
        let rounded = if pred > 0.5 { 1.0 } else { 0.0 };
        let mark = if rounded == ex.target[0] { "✓" } else { "✗" };
        println!(
            "  ({},{}) → {:.4}  target: {}  {}",
            ex.input[0], ex.input[1], pred, ex.target[0], mark
        );
    }
    println!();

    // 5. Save and restore
    let json = net.to_json()?;
    let restored = Network::from_json(&json)?;
    let same = data
        .iter()
        .map(|ex| Ok(net.predict(&ex.input)? == restored.predict(&ex.input)?))
        .collect::<synapse::Result<Vec<bool>>>()?
        .into_iter()
        .all(|b| b);
    println!("Saved {} bytes of JSON; restored network identical: {same}", json.len());

    println!();
    println!("=== Done! ===");
    Ok(())
}
