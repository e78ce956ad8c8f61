mod app;
mod ball;
mod rng;

use poppingball_engine::device::DeviceInit;
use poppingball_engine::logging::{init_logging, LoggingConfig};
use poppingball_engine::window::{Runtime, RuntimeConfig};

use app::PoppingBall;
use ball::BallManager;
use rng::XorShift32;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let app = PoppingBall::new(BallManager::new(XorShift32::from_time()));
    Runtime::run(RuntimeConfig::default(), DeviceInit::default(), app)
}
