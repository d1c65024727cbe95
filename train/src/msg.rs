/// Scalar readings of a single training step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainStepStats {
    pub loss_d: f32,
    pub loss_g: f32,

    /// Mean discriminator output on the real batch.
    pub d_x: f32,
    /// Mean discriminator output on the fakes, before the discriminator update.
    pub d_g_z1: f32,
    /// Mean discriminator output on the same fakes, after the discriminator update.
    pub d_g_z2: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub num_batches: usize,
    pub mean_loss_d: f32,
    pub mean_loss_g: f32,
}
