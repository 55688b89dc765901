//! Synthetic test data: a bright tube winding through a dark volume, and a
//! slightly off-centre trace along it.

use anyhow::Result;
use neurotube_fit::VoxelVolume;
use neurotube_math::{Calibration, Point3};
use neurotube_path::Path;

const MARGIN: f64 = 8.0;
const INSIDE: u8 = 200;
const OUTSIDE: u8 = 20;

/// Shape of the synthetic tube, in calibrated units.
#[derive(Debug, Clone)]
pub struct Tube {
    /// Extent along x.
    pub length: f64,
    /// Tube radius.
    pub radius: f64,
    /// Amplitude of the sideways (y) sine wave of the axis.
    pub amplitude: f64,
    /// Largest offset of the trace from the true axis.
    pub jitter: f64,
    /// Voxel spacing.
    pub calibration: Calibration,
}

impl Tube {
    fn centre_z(&self) -> f64 {
        self.radius + MARGIN
    }

    /// Axis position at `x`.
    fn axis(&self, x: f64) -> Point3 {
        let phase = 2.0 * std::f64::consts::PI * (x - MARGIN) / self.length;
        Point3::new(
            x,
            self.amplitude + self.radius + MARGIN + self.amplitude * phase.sin(),
            self.centre_z(),
        )
    }

    /// Rasterise the tube. Voxels whose centre is within `radius` of the axis
    /// in their x slice are bright.
    pub fn volume(&self) -> Result<VoxelVolume> {
        let cal = &self.calibration;
        let extent = [
            self.length + 2.0 * MARGIN,
            2.0 * (self.amplitude + self.radius + MARGIN),
            2.0 * self.centre_z(),
        ];
        let width = (extent[0] / cal.x).ceil() as usize;
        let height = (extent[1] / cal.y).ceil() as usize;
        let depth = (extent[2] / cal.z).ceil() as usize;

        let mut data = Vec::with_capacity(width * height * depth);
        for vz in 0..depth {
            for vy in 0..height {
                for vx in 0..width {
                    let world = cal.to_world(&Point3::new(vx as f64, vy as f64, vz as f64));
                    let axis = self.axis(world.x);
                    let (dy, dz) = (world.y - axis.y, world.z - axis.z);
                    let inside = dy * dy + dz * dz <= self.radius * self.radius;
                    data.push(if inside { INSIDE } else { OUTSIDE });
                }
            }
        }
        Ok(VoxelVolume::from_u8(width, height, depth, &data)?)
    }

    /// A trace with one node per unit of length, wobbling around the axis.
    pub fn trace(&self) -> Path {
        let nodes = self.length.floor() as usize + 1;
        let points: Vec<Point3> = (0..nodes)
            .map(|k| {
                let mut p = self.axis(MARGIN + k as f64);
                p.y += self.jitter * (1.7 * k as f64).sin();
                p.z += self.jitter * (0.9 * k as f64).cos();
                p
            })
            .collect();
        Path::from_points(self.calibration.clone(), &points)
    }
}
