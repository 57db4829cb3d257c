use rand::rngs::StdRng;
use rand::SeedableRng;

use ferrite_cwgan::gan::image_task::ImageTask;
use ferrite_cwgan::{Matrix, Task};

#[test]
fn generator_and_critic_shapes() {
    let task = ImageTask::default();
    assert_eq!(task.target_shape(), vec![28, 28, 1]);

    let mut rng = StdRng::seed_from_u64(3);
    let generator = task.build_generator(16, &mut rng);
    let critic = task.build_critic(&mut rng);

    let mut labels = Matrix::zeros(2, 10);
    labels.data[0][3] = 1.0;
    labels.data[1][7] = 1.0;
    let images = generator.generate(&labels, &generator.sample_noise(2, &mut rng));
    assert_eq!(images.shape(), (2, 28 * 28));
    assert!(images.data.iter().flatten().all(|v| (-1.0..=1.0).contains(v)));

    let scores = critic.score(&labels, &images);
    assert_eq!(scores.shape(), (2, 1));
    assert!(scores.is_finite());
}
