use rs_chain_kinematics::model_file::chain_from_file;
use rs_chain_kinematics::visualization;

/// Shows a robot read from a file, with sliders for the joints.
/// The model may be given as the first argument, the mesh directory as the second.
fn main() {
    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "src/tests/data/simple_arm.urdf".to_string());
    let mesh_dir = args.next().unwrap_or_else(|| "src/tests/data".to_string());

    let chain = match chain_from_file(&model) {
        Ok(chain) => chain,
        Err(err) => {
            eprintln!("Cannot read {}: {}", model, err);
            std::process::exit(1);
        }
    };
    println!("{}", chain);

    // Initial joint values, degrees for revolute joints
    let initial_values = [30.0, -45.0];
    visualization::visualize_chain(chain, mesh_dir, &initial_values);
}
