use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use rs_chain_kinematics::ik::{self, IkConfig};
use rs_chain_kinematics::model_file::chain_from_file;
use rs_chain_kinematics::serial_chain::SerialChain;
use rs_chain_kinematics::utils::{dump_joints, dump_pose, format_pose, is_valid};

/// Inspects a URDF or MJCF model: prints the frame tree, the joints, and the pose
/// of every link. With --end, also the Jacobian and an inverse kinematics round trip
/// for the path to that frame.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Model file (.urdf, .mjcf or .xml)
    model: PathBuf,

    /// End frame of the serial path (frame or link name)
    #[arg(long)]
    end: Option<String>,

    /// Start frame of the serial path, the root if not given
    #[arg(long, requires = "end")]
    root: Option<String>,

    /// Joint values in radians (meters for prismatic joints), comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    joints: Vec<f64>,

    /// YAML file with inverse kinematics settings
    #[arg(long)]
    ik_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let chain = chain_from_file(&args.model)
        .with_context(|| format!("Failed to read model {}", args.model.display()))?;

    println!("{}", chain);
    let names = chain.joint_parameter_names(true);
    println!("Joints ({}): {}", names.len(), names.join(", "));

    let Some(end) = args.end.as_deref() else {
        let joints = padded(&args.joints, names.len())?;
        let poses = chain.forward_kinematics(&joints)?;
        let mut links: Vec<_> = poses.iter().collect();
        links.sort_by(|a, b| a.0.cmp(b.0));
        for (link, pose) in links {
            println!("{:>20}: {}", link, format_pose(pose));
        }
        return Ok(());
    };

    let chain = Arc::new(chain);
    let end = frame_name(&chain, end);
    let serial = match args.root.as_deref() {
        Some(root) => SerialChain::with_root(chain.clone(), &end, &frame_name(&chain, root)),
        None => SerialChain::new(chain.clone(), &end),
    }
    .with_context(|| format!("No serial path to {}", end))?;

    let config = match &args.ik_config {
        Some(path) => IkConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => IkConfig::default(),
    };

    let joints = padded(&args.joints, serial.dof())?;
    println!("Serial joints: {}", serial.joint_parameter_names(true).join(", "));
    print!("Joint values (degrees): ");
    dump_joints(&joints);

    let pose = serial.forward_kinematics(&joints)?;
    print!("End pose: ");
    dump_pose(&pose);

    let jacobian = serial.jacobian(&joints)?;
    println!("Jacobian:{}", jacobian.matrix());

    let outcome = ik::solve(&serial, &pose, None, &config)?;
    print!("IK from zero, {} iterations, objective {:.3e}, converged {}: ", outcome.iterations,
           outcome.objective, outcome.converged);
    dump_joints(&outcome.joints);
    print!("Pose of the IK solution: ");
    dump_pose(&serial.forward_kinematics(&outcome.joints)?);
    Ok(())
}

/// Joint values from the command line, zero filled up to `dof`.
fn padded(values: &[f64], dof: usize) -> anyhow::Result<Vec<f64>> {
    if !is_valid(values) {
        bail!("Joint values must be finite numbers");
    }
    if values.len() > dof {
        bail!("{} joint values given, but the model has only {} joints", values.len(), dof);
    }
    let mut joints = values.to_vec();
    joints.resize(dof, 0.0);
    Ok(joints)
}

/// Accepts a link name where a frame name is expected.
fn frame_name(chain: &rs_chain_kinematics::chain::Chain, name: &str) -> String {
    if chain.find_frame(name).is_some() {
        return name.to_string();
    }
    chain
        .walk()
        .find(|frame| frame.link().name == name)
        .map(|frame| frame.name().to_string())
        .unwrap_or_else(|| name.to_string())
}
