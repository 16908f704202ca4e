//! Numerical inverse kinematics for anything implementing [`SerialKinematics`].
//!
//! The joint values are found by minimizing the pose discrepancy
//! `Σ (solve(target, fk(θ)) - I)²` over the 4x4 homogeneous matrices with a quasi-Newton
//! (BFGS) method. The gradient is estimated by central differences. There are no joint
//! limits and no guarantee of a global optimum: the solver returns the last iterate,
//! which callers should verify against their own tolerance.

use nalgebra::{DMatrix, DVector, Matrix4};
use tracing::{debug, trace};

use crate::kinematic_traits::{check_joint_count, Pose, SerialKinematics};
use crate::kinematics_error::KinematicsError;

/// Optimizer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkConfig {
    /// Upper bound on BFGS iterations; the only latency cap the solver has.
    pub max_iterations: usize,
    /// Stop once the gradient norm falls below this value.
    pub gradient_tolerance: f64,
    /// Step of the central-difference gradient.
    pub finite_difference_step: f64,
    /// Halvings tried by the backtracking line search before giving up.
    pub max_line_search_steps: usize,
}

impl Default for IkConfig {
    fn default() -> Self {
        IkConfig {
            max_iterations: 200,
            gradient_tolerance: 1e-10,
            finite_difference_step: 1e-6,
            max_line_search_steps: 40,
        }
    }
}

/// Result of an IK run. `joints` is always the last iterate, converged or not.
#[derive(Clone, Debug, PartialEq)]
pub struct IkOutcome {
    pub joints: Vec<f64>,
    /// Final value of the pose discrepancy.
    pub objective: f64,
    pub iterations: usize,
    /// True if the gradient tolerance was reached.
    pub converged: bool,
}

/// Sufficient decrease constant of the Armijo condition.
const ARMIJO_C1: f64 = 1e-4;

/// Pose discrepancy between `pose` and `target`, zero if they are equal.
pub fn pose_discrepancy(target: &Pose, pose: &Pose) -> f64 {
    let delta = match target.matrix().lu().solve(&pose.matrix()) {
        Some(m) => m - Matrix4::identity(),
        // A rigid transform is never singular
        None => return f64::INFINITY,
    };
    delta.component_mul(&delta).sum()
}

/// Joint values that move the end of `robot` to `target`, starting from `initial`
/// (zeros if not given). Non-convergence is not an error.
///
/// # Errors
/// [`KinematicsError::JointCountMismatch`] if `initial` does not match `robot.dof()`.
pub fn inverse_kinematics<K>(robot: &K, target: &Pose, initial: Option<&[f64]>, config: &IkConfig)
                             -> Result<Vec<f64>, KinematicsError>
where
    K: SerialKinematics + ?Sized,
{
    Ok(solve(robot, target, initial, config)?.joints)
}

/// Same as [`inverse_kinematics`], reporting how the optimizer ended.
pub fn solve<K>(robot: &K, target: &Pose, initial: Option<&[f64]>, config: &IkConfig)
                -> Result<IkOutcome, KinematicsError>
where
    K: SerialKinematics + ?Sized,
{
    let dof = robot.dof();
    let start = match initial {
        Some(qs) => {
            check_joint_count(dof, qs)?;
            DVector::from_column_slice(qs)
        }
        None => DVector::zeros(dof),
    };

    let objective = |x: &DVector<f64>| -> Result<f64, KinematicsError> {
        Ok(pose_discrepancy(target, &robot.forward(x.as_slice())?))
    };
    debug!(dof, max_iterations = config.max_iterations, "starting inverse kinematics");

    let outcome = bfgs(objective, start, config)?;
    debug!(
        iterations = outcome.iterations,
        objective = outcome.objective,
        converged = outcome.converged,
        "inverse kinematics finished"
    );
    Ok(outcome)
}

fn gradient<F>(f: &F, x: &DVector<f64>, h: f64) -> Result<DVector<f64>, KinematicsError>
where
    F: Fn(&DVector<f64>) -> Result<f64, KinematicsError>,
{
    let mut g = DVector::zeros(x.len());
    let mut shifted = x.clone();
    for i in 0..x.len() {
        shifted[i] = x[i] + h;
        let plus = f(&shifted)?;
        shifted[i] = x[i] - h;
        let minus = f(&shifted)?;
        shifted[i] = x[i];
        g[i] = (plus - minus) / (2.0 * h);
    }
    Ok(g)
}

/// BFGS with the inverse Hessian approximation and a backtracking Armijo line search.
fn bfgs<F>(f: F, start: DVector<f64>, config: &IkConfig) -> Result<IkOutcome, KinematicsError>
where
    F: Fn(&DVector<f64>) -> Result<f64, KinematicsError>,
{
    let n = start.len();
    let h = config.finite_difference_step;

    let mut x = start;
    let mut fx = f(&x)?;
    let mut g = gradient(&f, &x, h)?;
    let mut inv_hessian = DMatrix::<f64>::identity(n, n);
    let mut first_update = true;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        if g.norm() < config.gradient_tolerance {
            converged = true;
            break;
        }
        iterations += 1;

        let mut direction = -(&inv_hessian * &g);
        let mut slope = direction.dot(&g);
        if slope >= 0.0 {
            // Lost positive definiteness, restart from steepest descent
            inv_hessian = DMatrix::identity(n, n);
            first_update = true;
            direction = -g.clone();
            slope = direction.dot(&g);
        }

        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_steps {
            let candidate = &x + &direction * step;
            let f_candidate = f(&candidate)?;
            if f_candidate <= fx + ARMIJO_C1 * step * slope {
                accepted = Some((candidate, f_candidate));
                break;
            }
            step *= 0.5;
        }
        let Some((x_next, f_next)) = accepted else {
            trace!(iterations, objective = fx, "line search could not decrease the objective");
            break;
        };

        let g_next = gradient(&f, &x_next, h)?;
        let s = &x_next - &x;
        let y = &g_next - &g;
        let sy = s.dot(&y);
        if sy > f64::EPSILON * s.norm() * y.norm() {
            if first_update {
                inv_hessian *= sy / y.dot(&y);
                first_update = false;
            }
            let rho = 1.0 / sy;
            let identity = DMatrix::<f64>::identity(n, n);
            let left = &identity - &s * y.transpose() * rho;
            let right = &identity - &y * s.transpose() * rho;
            inv_hessian = &left * &inv_hessian * &right + &s * s.transpose() * rho;
        }

        x = x_next;
        fx = f_next;
        g = g_next;
        trace!(iterations, objective = fx, gradient = g.norm(), "bfgs step");
    }

    Ok(IkOutcome {
        joints: x.as_slice().to_vec(),
        objective: fx,
        iterations,
        converged,
    })
}
