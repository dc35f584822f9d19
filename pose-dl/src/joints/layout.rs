use super::transform_joint_to_other_db;
use crate::common::*;

const COCO_JOINTS: [&str; 17] = [
    "Nose",
    "L_Eye",
    "R_Eye",
    "L_Ear",
    "R_Ear",
    "L_Shoulder",
    "R_Shoulder",
    "L_Elbow",
    "R_Elbow",
    "L_Wrist",
    "R_Wrist",
    "L_Hip",
    "R_Hip",
    "L_Knee",
    "R_Knee",
    "L_Ankle",
    "R_Ankle",
];

const MPII_JOINTS: [&str; 16] = [
    "R_Ankle",
    "R_Knee",
    "R_Hip",
    "L_Hip",
    "L_Knee",
    "L_Ankle",
    "Pelvis",
    "Thorax",
    "Neck",
    "Head",
    "R_Wrist",
    "R_Elbow",
    "R_Shoulder",
    "L_Shoulder",
    "L_Elbow",
    "L_Wrist",
];

/// Joints synthesized as the mean of other joints. Entries already present
/// in the layout are kept as they are.
type DerivedJoints = &'static [(&'static str, &'static [&'static str])];

const COCO_DERIVED: DerivedJoints = &[
    ("Pelvis", &["L_Hip", "R_Hip"]),
    ("Thorax", &["L_Shoulder", "R_Shoulder"]),
    ("Neck", &["L_Shoulder", "R_Shoulder"]),
    ("Head", &["L_Ear", "R_Ear"]),
    ("Torso", &["L_Hip", "R_Hip", "L_Shoulder", "R_Shoulder"]),
];

const MPII_DERIVED: DerivedJoints = &[
    ("Torso", &["Pelvis", "Thorax"]),
    ("Nose", &["Neck", "Head"]),
];

/// The joint layout of a 2D keypoint detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypointLayout {
    /// 17 COCO joints, optionally followed by a neck joint.
    Coco,
    /// 16 MPII joints.
    Mpii,
}

impl KeypointLayout {
    /// The joint names for a detector output of `joint_num` joints.
    pub fn joints_name(&self, joint_num: usize) -> Result<Vec<&'static str>> {
        let names = match (self, joint_num) {
            (Self::Coco, 17) => COCO_JOINTS.to_vec(),
            (Self::Coco, 18) => COCO_JOINTS.iter().cloned().chain(["Neck"]).collect(),
            (Self::Mpii, 16) => MPII_JOINTS.to_vec(),
            (layout, joint_num) => {
                bail!("{:?} layout does not have {} joints", layout, joint_num)
            }
        };
        Ok(names)
    }

    fn derived_joints(&self) -> DerivedJoints {
        match self {
            Self::Coco => COCO_DERIVED,
            Self::Mpii => MPII_DERIVED,
        }
    }

    /// Converts detector keypoints of one sample into the native joint order.
    ///
    /// The derived joints are synthesized before the reordering. Native
    /// joints that the detector cannot provide are zero.
    pub fn to_native<S>(
        &self,
        keypoints: &[[f64; 2]],
        native_names: &[S],
    ) -> Result<Vec<[f64; 2]>>
    where
        S: AsRef<str>,
    {
        let mut names = self.joints_name(keypoints.len())?;
        let mut values = keypoints.to_vec();

        for &(name, sources) in self.derived_joints() {
            if names.contains(&name) {
                continue;
            }

            let indices: Vec<_> = sources
                .iter()
                .map(|source| {
                    names
                        .iter()
                        .position(|name| name == source)
                        .ok_or_else(|| format_err!("joint '{}' is missing", source))
                })
                .collect::<Result<_>>()?;
            let count = indices.len() as f64;
            let [sum_x, sum_y] = indices.iter().fold([0.0, 0.0], |[sx, sy], &index| {
                let [x, y] = values[index];
                [sx + x, sy + y]
            });

            names.push(name);
            values.push([sum_x / count, sum_y / count]);
        }

        transform_joint_to_other_db(&values, &names, native_names)
    }
}

/// The origin of the 2D keypoints fed to the lifting network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeypointSource {
    /// Use annotated joints.
    GroundTruth,
    /// Use precomputed detector outputs stored in archives named after the detector.
    Detector { name: String, layout: KeypointLayout },
}

impl KeypointSource {
    /// Resolves a keypoint source name.
    ///
    /// `gt` selects ground truth, `pelee` the COCO layout, and names
    /// containing `resnet` the MPII layout.
    pub fn parse(name: &str) -> Result<Self> {
        let source = match name {
            "gt" => Self::GroundTruth,
            "pelee" => Self::Detector {
                name: name.to_owned(),
                layout: KeypointLayout::Coco,
            },
            name if name.contains("resnet") => Self::Detector {
                name: name.to_owned(),
                layout: KeypointLayout::Mpii,
            },
            name => bail!(
                "unknown keypoint source '{}', expect 'gt', 'pelee' or a resnet detector",
                name
            ),
        };
        Ok(source)
    }

    pub fn is_ground_truth(&self) -> bool {
        matches!(self, Self::GroundTruth)
    }
}

impl FromStr for KeypointSource {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}
