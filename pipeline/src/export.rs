use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use burn::prelude::{Backend, Tensor};
use image::{Rgb, RgbImage};
use plotters::prelude::*;
use train::history::LossHistory;

use crate::config::PipelineConfig;
use crate::message::ExportedFiles;

/// Tiles `[n, channels, h, w]` values in [-1, 1] into one RGB image.
///
/// Cells are `padding` pixels apart on a black background, `columns` per row.
/// Single channel images are repeated over RGB.
pub fn make_grid(values: &[f32], shape: [usize; 4], columns: usize, padding: usize) -> RgbImage {
    let [count, channels, height, width] = shape;
    let columns = columns.min(count).max(1);
    let rows = count.div_ceil(columns);

    let grid_width = columns * (width + padding) + padding;
    let grid_height = rows * (height + padding) + padding;
    let mut grid = RgbImage::new(grid_width as u32, grid_height as u32);

    let plane = height * width;
    for index in 0..count {
        let x0 = padding + (index % columns) * (width + padding);
        let y0 = padding + (index / columns) * (height + padding);
        let sample = &values[index * channels * plane..(index + 1) * channels * plane];

        for y in 0..height {
            for x in 0..width {
                let pixel = std::array::from_fn(|c| {
                    let channel = if channels == 1 { 0 } else { c };
                    let value = sample[channel * plane + y * width + x];
                    (((value + 1.0) / 2.0).clamp(0.0, 1.0) * 255.0).round() as u8
                });
                grid.put_pixel((x0 + x) as u32, (y0 + y) as u32, Rgb(pixel));
            }
        }
    }
    grid
}

pub async fn save_sample_grid<B: Backend>(
    samples: Tensor<B, 4>,
    columns: usize,
    padding: usize,
    path: &Path,
) -> Result<()> {
    let shape = samples.dims();
    let values = samples
        .into_data_async()
        .await
        .into_vec::<f32>()
        .map_err(|e| anyhow!("Generated samples are not f32: {e:?}"))?;

    let grid = make_grid(&values, shape, columns, padding);
    log::info!("Saving sample grid to {path:?}");
    grid.save(path)
        .with_context(|| format!("Failed to write sample grid to {path:?}"))?;
    Ok(())
}

/// Draws the generator and discriminator losses over the global batch counter.
pub fn plot_losses(history: &LossHistory, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to clear loss plot: {e}"))?;

    let max_loss = history
        .generator()
        .iter()
        .chain(history.discriminator())
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max)
        .max(1e-3);
    let x_max = history.len().max(2) - 1;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..x_max, 0.0f32..max_loss * 1.05)
        .map_err(|e| anyhow!("Failed to build loss chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("iterations")
        .y_desc("loss")
        .draw()
        .map_err(|e| anyhow!("Failed to draw loss axes: {e}"))?;

    for (name, values, color) in [
        ("G", history.generator(), BLUE),
        ("D", history.discriminator(), RED),
    ] {
        chart
            .draw_series(LineSeries::new(values.iter().copied().enumerate(), color))
            .map_err(|e| anyhow!("Failed to draw {name} losses: {e}"))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow!("Failed to draw loss legend: {e}"))?;

    root.present()
        .map_err(|e| anyhow!("Failed to write loss plot to {path:?}: {e}"))?;
    Ok(())
}

/// Writes the sample grid, loss plot and loss history into the export directory.
pub async fn export_run<B: Backend>(
    config: &PipelineConfig,
    samples: Tensor<B, 4>,
    history: &LossHistory,
) -> Result<ExportedFiles> {
    let dir = PathBuf::from(&config.export_path);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create export directory {dir:?}"))?;

    let files = ExportedFiles {
        samples: dir.join(&config.sample_name),
        loss_plot: dir.join(&config.loss_plot_name),
        history: dir.join(&config.history_name),
    };

    save_sample_grid(samples, config.grid_columns, config.grid_padding, &files.samples).await?;

    log::info!("Saving loss plot to {:?}", files.loss_plot);
    plot_losses(history, &files.loss_plot)?;

    history
        .save_json(&files.history)
        .with_context(|| format!("Failed to write loss history to {:?}", files.history))?;

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::{make_grid, plot_losses};
    use image::Rgb;
    use train::history::LossHistory;
    use train::msg::TrainStepStats;

    #[test]
    fn grid_layout_and_value_mapping() {
        // Three 2x2 RGB samples: all -1, all 0, all 1.
        let mut values = vec![];
        for v in [-1.0f32, 0.0, 1.0] {
            values.extend(std::iter::repeat_n(v, 3 * 2 * 2));
        }
        let grid = make_grid(&values, [3, 3, 2, 2], 2, 1);

        // Two columns, two rows.
        assert_eq!(grid.dimensions(), (2 * 3 + 1, 2 * 3 + 1));
        assert_eq!(grid.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(grid.get_pixel(1, 1), &Rgb([0, 0, 0]));
        assert_eq!(grid.get_pixel(4, 1), &Rgb([128, 128, 128]));
        assert_eq!(grid.get_pixel(1, 4), &Rgb([255, 255, 255]));
        // Empty last cell stays black.
        assert_eq!(grid.get_pixel(4, 4), &Rgb([0, 0, 0]));
    }

    #[test]
    fn grayscale_is_repeated_over_rgb() {
        let grid = make_grid(&[1.0; 4], [1, 1, 2, 2], 8, 0);
        assert_eq!(grid.dimensions(), (2, 2));
        assert_eq!(grid.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn loss_plot_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.svg");

        let mut history = LossHistory::new();
        for i in 0..10 {
            history.push(&TrainStepStats {
                loss_d: 1.4 - i as f32 * 0.1,
                loss_g: 0.7 + i as f32 * 0.2,
                d_x: 0.5,
                d_g_z1: 0.5,
                d_g_z2: 0.5,
            });
        }
        plot_losses(&history, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline"));
    }
}
