//! Tests for argument parsing, settings precedence and end-to-end runs

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tessellate::io::cli::{Cli, Command, MosaicRunner};

    fn write_solid(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
        ::image::RgbImage::from_pixel(width, height, ::image::Rgb(rgb))
            .save(path)
            .expect("write image");
    }

    // Tests subcommand parsing and defaults
    #[test]
    fn test_parse_image_command() {
        let cli = Cli::try_parse_from([
            "tessellate",
            "image",
            "target.jpg",
            "--scale",
            "8",
            "-c",
            "library",
            "-o",
            "out/{name}_{scale}.png",
        ])
        .expect("parse");

        let Command::Image(args) = &cli.command else {
            panic!("expected image command");
        };
        assert_eq!(args.scale, 8);
        assert!((args.shared.height_aspect - 4.0).abs() < f64::EPSILON);
        assert!((args.shared.width_aspect - 3.0).abs() < f64::EPSILON);
        assert!(cli.should_show_progress());
    }

    // Tests flags override the defaults
    // Verified by ignoring the weighted-k flag
    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "tessellate",
            "frames",
            "frames_dir",
            "--scale",
            "4",
            "-c",
            "library",
            "-o",
            "out.gif",
            "--randomness",
            "0.1",
            "-k",
            "5",
            "--weighted-k",
            "--no-trim",
            "--no-cache",
            "--workers",
            "2",
            "--seed",
            "9",
            "--quiet",
        ])
        .expect("parse");

        let settings = cli.shared().settings().expect("settings");

        assert!((settings.mosaic.randomness - 0.1).abs() < f64::EPSILON);
        assert_eq!(settings.mosaic.best_k, 5);
        assert!(!settings.mosaic.uniform_k);
        assert!(!settings.mosaic.trim);
        assert_eq!(settings.mosaic.seed, 9);
        assert!(!settings.index.caching);
        assert_eq!(settings.index.workers, 2);
        assert!(!cli.should_show_progress());
    }

    // Tests flags take precedence over the config file
    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("settings.json");
        fs::write(
            &config,
            r#"{ "mosaic": { "opacity": 0.4, "best_k": 3 }, "index": { "workers": 7 } }"#,
        )
        .expect("write config");

        let cli = Cli::try_parse_from([
            "tessellate",
            "image",
            "t.png",
            "--scale",
            "2",
            "-c",
            "lib",
            "-o",
            "o.png",
            "--best-k",
            "2",
            "--config",
            config.to_str().expect("utf-8 path"),
        ])
        .expect("parse");

        let settings = cli.shared().settings().expect("settings");

        assert!((settings.mosaic.opacity - 0.4).abs() < f64::EPSILON);
        assert_eq!(settings.mosaic.best_k, 2);
        assert_eq!(settings.index.workers, 7);
    }

    // Tests a full image run writes the named output
    // Verified by skipping the save step
    #[test]
    fn test_run_image_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let library = dir.path().join("library");
        fs::create_dir_all(&library).expect("library dir");
        write_solid(&library.join("red.png"), 30, 40, [220, 20, 20]);
        write_solid(&library.join("blue.png"), 30, 40, [20, 20, 220]);
        write_solid(&library.join("wide.png"), 40, 30, [20, 220, 20]);
        let target = dir.path().join("scene.png");
        write_solid(&target, 60, 80, [200, 30, 30]);

        let output = dir.path().join("out/{name}_{scale}.png");
        let cli = Cli::try_parse_from([
            "tessellate",
            "image",
            target.to_str().expect("utf-8 path"),
            "--scale",
            "2",
            "-c",
            library.to_str().expect("utf-8 path"),
            "-o",
            output.to_str().expect("utf-8 path"),
            "--no-cache",
            "--quiet",
        ])
        .expect("parse");

        MosaicRunner::new(cli).run().expect("run");

        let written = ::image::open(dir.path().join("out/scene_2.png")).expect("output");
        assert_eq!((written.width(), written.height()), (60, 80));
        let pixel = written.to_rgb8().get_pixel(10, 10).0;
        assert!(pixel.iter().zip([220u8, 20, 20]).all(|(&a, b)| a.abs_diff(b) <= 1));
    }
}
