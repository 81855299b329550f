use timeclock_client::clock_run;

fn main() {
    clock_run();
}
