//! Implementations for the swing trajectory planner state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use nalgebra::{Matrix3, Matrix3x4, Rotation3, Vector3, Vector6};
use serde::Serialize;

// Internal
use super::{frames, BaseFrame, Params, Surface, SwingTrajError, NUM_FEET};
use crate::{
    curve::{CurveSample, StartState, SwingCurve},
    gait::Gait,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Swing time closer than this to the swing duration counts as complete.
///
/// Units: seconds
const T0S_TOLERANCE_S: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swing trajectory planner state.
pub struct SwingTrajPlanner {
    params: Params,

    initialised: bool,

    gait: Option<Gait>,

    feet: [FootState; NUM_FEET],

    /// Current tick index.
    k: usize,

    /// Units: meters,
    /// Frame: World
    position_m: Matrix3x4<f64>,

    /// Units: meters/second,
    /// Frame: World
    velocity_ms: Matrix3x4<f64>,

    /// Units: meters/second^2,
    /// Frame: World
    acceleration_mss: Matrix3x4<f64>,

    /// Units: meters/second^3,
    /// Frame: World
    jerk_msss: Matrix3x4<f64>,

    /// Touchdown targets after projection onto their surfaces.
    ///
    /// Units: meters,
    /// Frame: World
    targets_m: Matrix3x4<f64>,

    base_pose: BasePose,

    report: StatusReport,

    arch: Archiver,
}

/// Pose of the robot base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasePose {
    /// Units: meters,
    /// Frame: World
    pub position_m: Vector3<f64>,

    /// Roll, pitch and yaw.
    ///
    /// Units: radians
    pub rpy_rad: Vector3<f64>,
}

/// Input data to the planner.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Control tick index
    pub k: usize,

    /// Desired touchdown position of each foot.
    ///
    /// Units: meters,
    /// Frame: World
    pub targets_m: Matrix3x4<f64>,

    /// Supporting surface of each foot.
    pub surfaces: [Surface; NUM_FEET],

    /// Current base pose.
    pub base_pose: BasePose,
}

/// Kinematics of every foot for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    pub position_m: Matrix3x4<f64>,
    pub velocity_ms: Matrix3x4<f64>,
    pub acceleration_mss: Matrix3x4<f64>,
    pub jerk_msss: Matrix3x4<f64>,
}

/// Status report for one planner tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// True for each foot which is following a swing curve
    pub swinging: [bool; NUM_FEET],

    /// Number of swings started this tick
    pub num_liftoffs: usize,

    /// Number of curves recomputed for a new target this tick
    pub num_replans: usize,

    /// Number of new targets ignored because their swing was locked
    pub num_ignored_targets: usize,

    /// Number of swings cut short by the gait returning to contact
    pub num_early_touchdowns: usize,
}

/// Phase of a single foot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FootPhase {
    /// In contact, holding position
    Stance,
    /// Following a swing curve
    Swing,
    /// Swing complete, waiting for the gait to return to contact
    Landed,
}

/// Per foot swing state.
#[derive(Debug)]
struct FootState {
    phase: FootPhase,

    /// Time since the start of the current swing
    ///
    /// Units: seconds
    t0s_s: f64,

    /// Units: seconds
    t_swing_s: f64,

    curve: Option<Box<dyn SwingCurve>>,

    /// Swing time at which the active curve starts.
    ///
    /// Units: seconds
    curve_start_s: f64,

    /// Units: meters
    liftoff_m: Vector3<f64>,

    /// Units: meters
    touchdown_m: Vector3<f64>,

    last: CurveSample,
}

/// One archived row, one per foot per tick.
#[derive(Serialize)]
struct FootRecord {
    time_s: f64,
    k: usize,
    foot: usize,
    phase: FootPhase,
    t0s_s: f64,
    pos_x_m: f64,
    pos_y_m: f64,
    pos_z_m: f64,
    vel_x_ms: f64,
    vel_y_ms: f64,
    vel_z_ms: f64,
    acc_x_mss: f64,
    acc_y_mss: f64,
    acc_z_mss: f64,
    target_x_m: f64,
    target_y_m: f64,
    target_z_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BasePose {
    /// Create a pose from `[x, y, z, roll, pitch, yaw]`.
    pub fn from_vector6(q: &Vector6<f64>) -> Self {
        Self {
            position_m: Vector3::new(q[0], q[1], q[2]),
            rpy_rad: Vector3::new(q[3], q[4], q[5]),
        }
    }

    /// Rotation of the base in the world frame.
    pub fn rotation(&self) -> Matrix3<f64> {
        Rotation3::from_euler_angles(self.rpy_rad.x, self.rpy_rad.y, self.rpy_rad.z)
            .into_inner()
    }

    /// The frame which takes world vectors into this base's frame.
    pub fn base_frame(&self) -> BaseFrame {
        let r_wb = self.rotation();
        let r_bw = r_wb.transpose();
        BaseFrame::new(r_bw, -(r_bw * self.position_m))
    }
}

impl Default for BasePose {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            rpy_rad: Vector3::zeros(),
        }
    }
}

impl FootState {
    fn new(position_m: Vector3<f64>, t_swing_s: f64) -> Self {
        Self {
            phase: FootPhase::Stance,
            t0s_s: 0.0,
            t_swing_s,
            curve: None,
            curve_start_s: 0.0,
            liftoff_m: position_m,
            touchdown_m: position_m,
            last: CurveSample {
                position_m,
                ..Default::default()
            },
        }
    }

    /// A sample at rest at the given position.
    fn rest(position_m: Vector3<f64>) -> CurveSample {
        CurveSample {
            position_m,
            ..Default::default()
        }
    }

    /// Sample the active curve at the current swing time.
    fn sample_curve(&self) -> CurveSample {
        match self.curve {
            Some(ref c) => c.sample((self.t0s_s - self.curve_start_s) / c.duration_s()),
            None => Self::rest(self.last.position_m),
        }
    }
}

impl Default for SwingTrajPlanner {
    fn default() -> Self {
        Self {
            params: Params::default(),
            initialised: false,
            gait: None,
            feet: Default::default(),
            k: 0,
            position_m: Matrix3x4::zeros(),
            velocity_ms: Matrix3x4::zeros(),
            acceleration_mss: Matrix3x4::zeros(),
            jerk_msss: Matrix3x4::zeros(),
            targets_m: Matrix3x4::zeros(),
            base_pose: BasePose::default(),
            report: StatusReport::default(),
            arch: Archiver::default(),
        }
    }
}

impl Default for FootState {
    fn default() -> Self {
        Self::new(Vector3::zeros(), 0.0)
    }
}

impl State for SwingTrajPlanner {
    type InitData = (&'static str, Gait);
    type InitError = SwingTrajError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = SwingTrajError;

    /// Initialise the planner.
    ///
    /// Expected init data is the path to the parameter file and the initial
    /// gait.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let (params_path, gait) = init_data;
        let params: Params = params::load(params_path)?;
        self.initialize(params, gait)
    }

    /// Perform one tick of planning.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.update(
            input_data.k,
            &input_data.targets_m,
            &input_data.surfaces,
            &input_data.base_pose,
        )?;

        Ok((self.output()?, self.report))
    }
}

impl Archived for SwingTrajPlanner {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let time_s = session::get_elapsed_seconds();

        for foot in 0..NUM_FEET {
            let f = &self.feet[foot];
            let rec = FootRecord {
                time_s,
                k: self.k,
                foot,
                phase: f.phase,
                t0s_s: f.t0s_s,
                pos_x_m: self.position_m[(0, foot)],
                pos_y_m: self.position_m[(1, foot)],
                pos_z_m: self.position_m[(2, foot)],
                vel_x_ms: self.velocity_ms[(0, foot)],
                vel_y_ms: self.velocity_ms[(1, foot)],
                vel_z_ms: self.velocity_ms[(2, foot)],
                acc_x_mss: self.acceleration_mss[(0, foot)],
                acc_y_mss: self.acceleration_mss[(1, foot)],
                acc_z_mss: self.acceleration_mss[(2, foot)],
                target_x_m: self.targets_m[(0, foot)],
                target_y_m: self.targets_m[(1, foot)],
                target_z_m: self.targets_m[(2, foot)],
            };
            self.arch.serialise(rec)?;
        }

        Ok(())
    }
}

impl SwingTrajPlanner {
    /// Create a new, uninitialised planner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parameters and gait, resetting every foot to stance at its
    /// initial position.
    pub fn initialize(&mut self, params: Params, gait: Gait) -> Result<(), SwingTrajError> {
        params.validate()?;

        for foot in 0..NUM_FEET {
            let p = Vector3::from(params.footsteps_init_m[foot]);
            self.feet[foot] = FootState::new(p, params.t_swing_s[foot]);
            self.position_m.set_column(foot, &p);
            self.targets_m.set_column(foot, &p);
        }
        self.velocity_ms = Matrix3x4::zeros();
        self.acceleration_mss = Matrix3x4::zeros();
        self.jerk_msss = Matrix3x4::zeros();
        self.report = StatusReport::default();
        self.k = 0;

        debug!(
            "SwingTrajPlanner initialised: {:?} curves, t_swing = {:?} s",
            params.curve_kind, params.t_swing_s
        );

        self.params = params;
        self.gait = Some(gait);
        self.initialised = true;

        Ok(())
    }

    /// Replace the gait pattern, for instance with one from a new MPC result.
    pub fn set_gait(&mut self, gait: Gait) -> Result<(), SwingTrajError> {
        if !self.initialised {
            return Err(SwingTrajError::NotInitialised);
        }
        crate::gait::validate_contacts(gait.contacts())?;
        self.gait = Some(gait);
        Ok(())
    }

    /// Open the CSV archive for this planner in the session.
    pub fn enable_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        self.arch = Archiver::from_path(session, "swing_traj/feet.csv")?;
        Ok(())
    }

    /// Advance all feet by one control period.
    ///
    /// Swinging feet follow their curve towards `targets_m` projected onto
    /// their `surfaces`, feet in stance hold position.
    pub fn update(
        &mut self,
        k: usize,
        targets_m: &Matrix3x4<f64>,
        surfaces: &[Surface; NUM_FEET],
        base_pose: &BasePose,
    ) -> Result<(), SwingTrajError> {
        if !self.initialised {
            return Err(SwingTrajError::NotInitialised);
        }

        for foot in 0..NUM_FEET {
            if targets_m.column(foot).iter().any(|v| !v.is_finite()) {
                return Err(SwingTrajError::InvalidTarget(foot));
            }
            surfaces[foot].validate()?;
        }

        if k != 0 && k != self.k + 1 {
            trace!("SwingTrajPlanner tick jumped from {} to {}", self.k, k);
        }
        self.k = k;
        self.base_pose = *base_pose;
        self.report = StatusReport::default();

        let swing_flags = match self.gait {
            Some(ref g) => {
                let mut flags = [false; NUM_FEET];
                for (foot, f) in flags.iter_mut().enumerate() {
                    *f = g.is_swing(foot);
                }
                flags
            }
            None => return Err(SwingTrajError::NotInitialised),
        };

        for foot in 0..NUM_FEET {
            let target = surfaces[foot].project(&Vector3::from(targets_m.column(foot)));
            self.targets_m.set_column(foot, &target);

            let sample = self.update_foot(foot, swing_flags[foot], &target)?;

            self.feet[foot].last = sample;
            self.report.swinging[foot] = self.feet[foot].phase == FootPhase::Swing;

            self.position_m.set_column(foot, &sample.position_m);
            self.velocity_ms.set_column(foot, &sample.velocity_ms);
            self.acceleration_mss.set_column(foot, &sample.acceleration_mss);
            self.jerk_msss.set_column(foot, &sample.jerk_msss);
        }

        Ok(())
    }

    /// Step a single foot's state machine, returning its new sample.
    fn update_foot(
        &mut self,
        foot: usize,
        gait_swing: bool,
        target_m: &Vector3<f64>,
    ) -> Result<CurveSample, SwingTrajError> {
        let dt_s = self.params.dt_s;
        let phase = self.feet[foot].phase;

        match (phase, gait_swing) {
            (FootPhase::Stance, true) => {
                self.start_swing(foot, target_m)?;
                Ok(self.advance(foot, dt_s))
            }
            (FootPhase::Swing, _) if self.feet[foot].t0s_s >= self.feet[foot].t_swing_s => {
                // Terminal sample already emitted
                let f = &mut self.feet[foot];
                f.phase = if gait_swing { FootPhase::Landed } else { FootPhase::Stance };
                f.t0s_s = 0.0;
                Ok(FootState::rest(f.touchdown_m))
            }
            (FootPhase::Swing, true) => {
                self.check_retarget(foot, target_m)?;
                Ok(self.advance(foot, dt_s))
            }
            (FootPhase::Swing, false) => {
                let f = &mut self.feet[foot];
                warn!(
                    "Foot {} returned to contact at t0s = {:.3} s of a {:.3} s swing",
                    foot, f.t0s_s, f.t_swing_s
                );
                self.report.num_early_touchdowns += 1;
                f.phase = FootPhase::Stance;
                f.t0s_s = 0.0;
                Ok(FootState::rest(f.last.position_m))
            }
            (FootPhase::Landed, true) => {
                let f = &self.feet[foot];
                Ok(FootState::rest(f.touchdown_m))
            }
            (_, false) => {
                let f = &mut self.feet[foot];
                f.phase = FootPhase::Stance;
                f.t0s_s = 0.0;
                Ok(FootState::rest(f.last.position_m))
            }
        }
    }

    /// Begin a swing from the foot's current resting position.
    fn start_swing(&mut self, foot: usize, target_m: &Vector3<f64>) -> Result<(), SwingTrajError> {
        let liftoff_m = self.feet[foot].last.position_m;
        let t_swing_s = self.feet[foot].t_swing_s;
        let apex_m = liftoff_m.z.max(target_m.z) + self.params.step_height_m;

        let curve = self.params.curve_kind.build(
            &StartState::at_rest(liftoff_m),
            target_m,
            t_swing_s,
            Some(apex_m),
            self.params.bezier_degree,
        )?;

        let f = &mut self.feet[foot];
        f.phase = FootPhase::Swing;
        f.t0s_s = 0.0;
        f.curve = Some(curve);
        f.curve_start_s = 0.0;
        f.liftoff_m = liftoff_m;
        f.touchdown_m = *target_m;

        self.report.num_liftoffs += 1;
        debug!("Foot {} lift-off at k = {} towards {:?}", foot, self.k, target_m.as_slice());

        Ok(())
    }

    /// Recompute the curve of a swinging foot if its target has moved.
    ///
    /// The new curve starts from the last emitted sample so position,
    /// velocity and acceleration stay continuous.
    fn check_retarget(&mut self, foot: usize, target_m: &Vector3<f64>) -> Result<(), SwingTrajError> {
        let f = &self.feet[foot];
        if (target_m - f.touchdown_m).norm() <= self.params.retarget_tolerance_m {
            return Ok(());
        }

        if f.t0s_s >= self.params.lock_phase * f.t_swing_s {
            self.report.num_ignored_targets += 1;
            debug!(
                "Foot {} target change ignored, swing locked at t0s = {:.3} s",
                foot, f.t0s_s
            );
            return Ok(());
        }

        let remaining_s = f.t_swing_s - f.t0s_s;
        let apex_m = if f.t0s_s < 0.5 * f.t_swing_s {
            Some(f.liftoff_m.z.max(target_m.z) + self.params.step_height_m)
        } else {
            None
        };

        let curve = self.params.curve_kind.build(
            &StartState::from(&f.last),
            target_m,
            remaining_s,
            apex_m,
            self.params.bezier_degree,
        )?;

        let f = &mut self.feet[foot];
        f.curve_start_s = f.t0s_s;
        f.curve = Some(curve);
        f.touchdown_m = *target_m;

        self.report.num_replans += 1;
        debug!(
            "Foot {} re-planned at t0s = {:.3} s towards {:?}",
            foot, f.t0s_s, target_m.as_slice()
        );

        Ok(())
    }

    /// Advance the swing time of a foot and sample its curve.
    fn advance(&mut self, foot: usize, dt_s: f64) -> CurveSample {
        let f = &mut self.feet[foot];
        f.t0s_s = (f.t0s_s + dt_s).min(f.t_swing_s);

        // Summed periods fall just short of the swing duration
        if f.t_swing_s - f.t0s_s < T0S_TOLERANCE_S {
            f.t0s_s = f.t_swing_s;
        }

        if f.t0s_s >= f.t_swing_s {
            trace!("Foot {} touchdown at k = {}", foot, self.k);
            FootState::rest(f.touchdown_m)
        } else {
            f.sample_curve()
        }
    }

    fn check_init(&self) -> Result<(), SwingTrajError> {
        if self.initialised {
            Ok(())
        } else {
            Err(SwingTrajError::NotInitialised)
        }
    }

    // ---- ACCESSORS ----

    /// All world frame outputs of the last update.
    pub fn output(&self) -> Result<OutputData, SwingTrajError> {
        self.check_init()?;
        Ok(OutputData {
            position_m: self.position_m,
            velocity_ms: self.velocity_ms,
            acceleration_mss: self.acceleration_mss,
            jerk_msss: self.jerk_msss,
        })
    }

    /// Units: meters,
    /// Frame: World
    pub fn get_foot_position(&self) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(self.position_m)
    }

    /// Units: meters/second,
    /// Frame: World
    pub fn get_foot_velocity(&self) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(self.velocity_ms)
    }

    /// Units: meters/second^2,
    /// Frame: World
    pub fn get_foot_acceleration(&self) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(self.acceleration_mss)
    }

    /// Units: meters/second^3,
    /// Frame: World
    pub fn get_foot_jerk(&self) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(self.jerk_msss)
    }

    pub fn get_foot_position_base_frame(
        &self,
        frame: &BaseFrame,
    ) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(frames::position_to_base(frame, &self.position_m))
    }

    pub fn get_foot_velocity_base_frame(
        &self,
        frame: &BaseFrame,
    ) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(frames::velocity_to_base(frame, &self.position_m, &self.velocity_ms))
    }

    pub fn get_foot_acceleration_base_frame(
        &self,
        frame: &BaseFrame,
    ) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(frames::acceleration_to_base(
            frame,
            &self.position_m,
            &self.velocity_ms,
            &self.acceleration_mss,
        ))
    }

    pub fn get_foot_jerk_base_frame(
        &self,
        frame: &BaseFrame,
    ) -> Result<Matrix3x4<f64>, SwingTrajError> {
        self.check_init()?;
        Ok(frames::jerk_to_base(frame, &self.jerk_msss))
    }

    /// Sample the active curve of a foot at the normalised parameter `s`
    /// without changing any state.
    pub fn evaluate(&self, foot: usize, s: f64) -> Result<CurveSample, SwingTrajError> {
        self.check_init()?;
        let f = self.feet.get(foot).ok_or(SwingTrajError::InvalidFoot(foot))?;
        match f.curve {
            Some(ref c) => Ok(c.sample(s)),
            None => Err(SwingTrajError::NoActiveCurve(foot)),
        }
    }

    /// Time since the start of the current swing of each foot, zero for feet
    /// not swinging.
    ///
    /// Units: seconds
    pub fn t0s(&self) -> [f64; NUM_FEET] {
        let mut t = [0.0; NUM_FEET];
        for (foot, t) in t.iter_mut().enumerate() {
            *t = self.feet[foot].t0s_s;
        }
        t
    }

    /// Swing duration of each foot.
    ///
    /// Units: seconds
    pub fn t_swing(&self) -> [f64; NUM_FEET] {
        let mut t = [0.0; NUM_FEET];
        for (foot, t) in t.iter_mut().enumerate() {
            *t = self.feet[foot].t_swing_s;
        }
        t
    }

    /// Phase of each foot.
    pub fn phases(&self) -> [FootPhase; NUM_FEET] {
        let mut p = [FootPhase::Stance; NUM_FEET];
        for (foot, p) in p.iter_mut().enumerate() {
            *p = self.feet[foot].phase;
        }
        p
    }

    /// Projected touchdown targets of the last update.
    pub fn targets(&self) -> &Matrix3x4<f64> {
        &self.targets_m
    }

    /// Base pose given to the last update.
    pub fn base_pose(&self) -> &BasePose {
        &self.base_pose
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The current gait, if initialised.
    pub fn gait(&self) -> Option<&Gait> {
        self.gait.as_ref()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
